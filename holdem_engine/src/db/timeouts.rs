//! Database query timeout helpers
//!
//! Provides timeout wrappers for repository calls to prevent indefinite hangs.

use std::time::Duration;
use tokio::time::timeout;

use super::repository::{RepositoryError, RepositoryResult};

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute an operation with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `RepositoryResult<T>` - Result or `RepositoryError::Timeout`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> RepositoryResult<T>
where
    F: std::future::Future<Output = RepositoryResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout(duration)),
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> RepositoryResult<T>
where
    F: std::future::Future<Output = RepositoryResult<T>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
