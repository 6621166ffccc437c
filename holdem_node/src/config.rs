//! Node configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use holdem_engine::{
    db::DatabaseConfig,
    game::OddChipRule,
    table::{TableConfig, config::MAX_SEATS},
};
use std::net::SocketAddr;

/// Complete node configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Name this node registers its tables under
    pub node_id: String,
    /// Database configuration; `None` runs on in-memory storage
    pub database: Option<DatabaseConfig>,
    /// Prometheus scrape address; `None` disables the exporter
    pub metrics_bind: Option<SocketAddr>,
    /// Settings for the tables created on startup
    pub table_defaults: TableConfig,
    /// Number of tables to create on startup
    pub num_tables: usize,
}

impl NodeConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `num_tables_override` - Optional number of tables override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but malformed
    pub fn from_env(
        database_url_override: Option<String>,
        num_tables_override: Option<usize>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| "local".to_string());

        let database = match database_url_override.or_else(|| std::env::var("DATABASE_URL").ok())
        {
            Some(url) => Some(DatabaseConfig::from_env_with_url(url).map_err(|reason| {
                ConfigError::Invalid {
                    var: "DB_*".to_string(),
                    reason,
                }
            })?),
            None => None,
        };

        let metrics_bind = match metrics_bind_override {
            Some(addr) => Some(addr),
            None => match std::env::var("METRICS_BIND") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{raw}' is not an IP:PORT address"),
                })?),
                Err(_) => None,
            },
        };

        let odd_chip_rule = match std::env::var("TABLE_ODD_CHIP_RULE") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "button" | "clockwise" => OddChipRule::ClockwiseFromButton,
                "lowest_seat" => OddChipRule::LowestSeat,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "TABLE_ODD_CHIP_RULE".to_string(),
                        reason: format!("'{raw}' is not one of: button, lowest_seat"),
                    });
                }
            },
            Err(_) => OddChipRule::default(),
        };

        let defaults = TableConfig::default();
        let table_defaults = TableConfig {
            name: defaults.name.clone(),
            max_players: parse_env_or("TABLE_MAX_PLAYERS", defaults.max_players),
            small_blind: parse_env_or("TABLE_SMALL_BLIND", defaults.small_blind),
            big_blind: parse_env_or("TABLE_BIG_BLIND", defaults.big_blind),
            min_buy_in_bb: parse_env_or("TABLE_MIN_BUY_IN_BB", defaults.min_buy_in_bb),
            max_buy_in_bb: parse_env_or("TABLE_MAX_BUY_IN_BB", defaults.max_buy_in_bb),
            absolute_chip_cap: parse_env_or("ABSOLUTE_CHIP_CAP", defaults.absolute_chip_cap),
            post_blinds: parse_env_or("TABLE_POST_BLINDS", defaults.post_blinds),
            rake_basis_points: parse_env_or("TABLE_RAKE_BPS", defaults.rake_basis_points),
            rake_cap: std::env::var("TABLE_RAKE_CAP")
                .ok()
                .and_then(|v| v.parse().ok()),
            no_flop_no_drop: parse_env_or("TABLE_NO_FLOP_NO_DROP", defaults.no_flop_no_drop),
            odd_chip_rule,
            auto_start: parse_env_or("TABLE_AUTO_START", true),
            tick_interval_ms: parse_env_or("TABLE_TICK_INTERVAL_MS", defaults.tick_interval_ms),
        };

        let num_tables = num_tables_override.unwrap_or_else(|| parse_env_or("MAX_TABLES", 1));

        Ok(NodeConfig {
            node_id,
            database,
            metrics_bind,
            table_defaults,
            num_tables,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "NODE_ID".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.table_defaults.max_players > MAX_SEATS {
            return Err(ConfigError::Invalid {
                var: "TABLE_MAX_PLAYERS".to_string(),
                reason: format!("Must be at most {MAX_SEATS}"),
            });
        }

        self.table_defaults
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "TABLE_*".to_string(),
                reason,
            })?;

        if let Some(db) = &self.database
            && db.min_connections > db.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!("Cannot exceed max connections ({})", db.max_connections),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
