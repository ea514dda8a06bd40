pub mod import;
pub mod ingest;
pub mod report;
pub mod run;
pub mod status;

use crate::error::Result;
use crate::models::{AppConfig, IngestStats};
use crate::services::TimeSeriesStore;
use tokio::runtime::Runtime;

/// Resolve configuration or exit with code 1
fn load_config(local: bool) -> AppConfig {
    match AppConfig::from_env(local) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

/// Create the Tokio runtime for a command or exit with code 1
fn new_runtime() -> Runtime {
    match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    }
}

/// Open and load the configured store
async fn open_store(config: &AppConfig) -> Result<TimeSeriesStore> {
    let mut store = TimeSeriesStore::from_config(config);
    store.load().await?;
    println!(
        "💾 Store: {} ({}) - {} rows",
        store.location().display(),
        store.backend_type(),
        store.len()
    );
    Ok(store)
}

fn print_ingest_summary(stats: &IngestStats) {
    println!("\n📊 Ingestion summary:");
    println!(
        "   Funds:  {} processed ({} ok, {} failed)",
        stats.total_processed(),
        stats.successful,
        stats.failed
    );
    println!(
        "   Rows:   {} fetched, {} new, {} already stored",
        stats.fetched_records,
        stats.merged_records,
        stats.duplicate_records()
    );
}
