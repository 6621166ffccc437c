//! Table placement contract.
//!
//! Which node hosts a table is decided outside the engine. A node claims a
//! table before running it and releases it on close; [`LocalRegistry`]
//! covers the single-node case.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::game::entities::TableId;

pub type NodeId = String;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Table {table_id} is already hosted by {node}")]
    AlreadyAssigned { table_id: TableId, node: NodeId },

    #[error("Table {0} is not hosted here")]
    NotAssigned(TableId),

    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TableRegistry: Send + Sync {
    /// Claim `table_id` for this node.
    async fn assign(&self, table_id: TableId) -> Result<NodeId, RegistryError>;

    /// Node currently hosting `table_id`, if any.
    async fn locate(&self, table_id: TableId) -> Result<Option<NodeId>, RegistryError>;

    /// Give up `table_id`.
    async fn release(&self, table_id: TableId) -> Result<(), RegistryError>;
}

/// Registry for a node that hosts every table itself.
pub struct LocalRegistry {
    node_id: NodeId,
    tables: RwLock<HashMap<TableId, NodeId>>,
}

impl LocalRegistry {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new("local")
    }
}

#[async_trait]
impl TableRegistry for LocalRegistry {
    async fn assign(&self, table_id: TableId) -> Result<NodeId, RegistryError> {
        let mut tables = self.tables.write().await;
        if let Some(node) = tables.get(&table_id) {
            return Err(RegistryError::AlreadyAssigned {
                table_id,
                node: node.clone(),
            });
        }
        tables.insert(table_id, self.node_id.clone());
        Ok(self.node_id.clone())
    }

    async fn locate(&self, table_id: TableId) -> Result<Option<NodeId>, RegistryError> {
        Ok(self.tables.read().await.get(&table_id).cloned())
    }

    async fn release(&self, table_id: TableId) -> Result<(), RegistryError> {
        self.tables
            .write()
            .await
            .remove(&table_id)
            .map(|_| ())
            .ok_or(RegistryError::NotAssigned(table_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_locate_release() {
        let registry = LocalRegistry::new("node-a");
        assert_eq!(registry.assign(4).await.unwrap(), "node-a");
        assert_eq!(registry.locate(4).await.unwrap().as_deref(), Some("node-a"));
        assert!(matches!(
            registry.assign(4).await,
            Err(RegistryError::AlreadyAssigned { table_id: 4, .. })
        ));

        registry.release(4).await.unwrap();
        assert_eq!(registry.locate(4).await.unwrap(), None);
        assert_eq!(registry.release(4).await, Err(RegistryError::NotAssigned(4)));
    }
}
