//! Multi-table hold'em node using the async actor model.
//!
//! This node spawns TableActor instances managed by TableManager, backed by
//! PostgreSQL when a database is configured and by memory otherwise.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Error, anyhow};
use holdem_engine::{
    DeckService, TableManager, WalletLedger,
    db::{
        Database, HandHistoryRepository, HistoryRecorder, InMemoryHandHistoryRepository,
        InMemoryWalletRepository, WalletRepository,
    },
    table::{LocalRegistry, TableConfig},
};
use holdem_node::{audit, config::NodeConfig, logging, metrics};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a multi-table hold'em node

USAGE:
  holdem_node [OPTIONS]            Host tables until Ctrl+C
  holdem_node verify <FILE>        Replay a completed hand record (JSON)

OPTIONS:
  --db-url        URL        Database connection string  [default: env DATABASE_URL, else in-memory]
  --tables        N          Number of tables to create  [default: env MAX_TABLES or 1]
  --metrics-bind  IP:PORT    Prometheus scrape address   [default: env METRICS_BIND, else off]

FLAGS:
  -h, --help                 Print help information

ENVIRONMENT:
  NODE_ID                    Name this node registers tables under
  DATABASE_URL               PostgreSQL connection string
  TABLE_SMALL_BLIND          Small blind of startup tables
  TABLE_BIG_BLIND            Big blind of startup tables
  TABLE_RAKE_BPS             Rake in basis points
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    match pargs.subcommand()?.as_deref() {
        Some("verify") => {
            let path: PathBuf = pargs.free_from_str()?;
            return verify(&path);
        }
        Some(other) => return Err(anyhow!("Unknown command '{}'. See --help", other)),
        None => {}
    }

    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let num_tables: Option<usize> = pargs.opt_value_from_str("--tables")?;
    let metrics_bind: Option<SocketAddr> = pargs.opt_value_from_str("--metrics-bind")?;

    let config = NodeConfig::from_env(database_url, num_tables, metrics_bind)?;
    config.validate()?;
    serve(config).await
}

fn verify(path: &Path) -> Result<(), Error> {
    let verified = audit::verify_file(path)?;
    println!(
        "Hand {} on table {} verified: pot {}, rake {}, {} recorded actions, winners {:?}",
        verified.hand_id,
        verified.table_id,
        verified.pot,
        verified.rake,
        verified.actions,
        verified.winners
    );
    Ok(())
}

async fn serve(config: NodeConfig) -> Result<(), Error> {
    logging::init();
    info!("Starting hold'em node '{}'", config.node_id);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow!(e))?;
        info!("Serving metrics at http://{}/metrics", addr);
    }

    let (wallets, history, database) = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected successfully");
            let wallets: Arc<dyn WalletRepository> = Arc::new(db.wallet_repository());
            let history: Arc<dyn HandHistoryRepository> = Arc::new(db.hand_history_repository());
            (wallets, history, Some(db))
        }
        None => {
            log::warn!("DATABASE_URL not set; wallets and hand history live in memory only");
            let wallets: Arc<dyn WalletRepository> = Arc::new(InMemoryWalletRepository::new());
            let history: Arc<dyn HandHistoryRepository> =
                Arc::new(InMemoryHandHistoryRepository::new());
            (wallets, history, None)
        }
    };

    let table_manager = TableManager::new(
        Arc::new(WalletLedger::new(wallets)),
        HistoryRecorder::new(history),
        Arc::new(LocalRegistry::new(config.node_id.clone())),
        DeckService::default(),
    );

    info!("Creating {} initial table(s)...", config.num_tables);
    for i in 0..config.num_tables {
        let table_config = TableConfig {
            name: format!("Table {}", i + 1),
            ..config.table_defaults.clone()
        };
        match table_manager.create_table(table_config).await {
            Ok(table_id) => {
                logging::log_table_event(table_id, "created", &format!("Table {}", i + 1));
            }
            Err(e) => {
                log::error!("Failed to create table {}: {}", i + 1, e);
            }
        }
    }

    for table in table_manager.list_tables().await {
        info!(
            "  - {} (ID: {}) - {}/{} players, blinds: {}",
            table.name, table.table_id, table.player_count, table.max_players, table.blinds
        );
    }
    info!("Node is running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow!("Failed to listen for Ctrl+C: {}", e))?;

    info!("Shutting down: cashing out every table");
    for (table_id, report) in table_manager.shutdown().await {
        match report {
            Ok(report) => {
                for (player_id, chips) in report.unsettled {
                    logging::log_unsettled(table_id, player_id, chips);
                    metrics::unsettled_chips(chips);
                }
                logging::log_table_event(table_id, "closed", "Table closed");
            }
            Err(e) => log::error!("Failed to close table {}: {}", table_id, e),
        }
    }

    let flushed = table_manager.flush_history().await;
    info!(
        "Hand history flushed: {} saved, {} failed",
        flushed.saved, flushed.failed
    );

    if let Some(db) = database {
        db.close().await;
    }
    info!("Node stopped");
    Ok(())
}
