use crate::commands::report::write_reports;
use crate::commands::{load_config, new_runtime, open_store, print_ingest_summary};
use crate::error::Result;
use crate::models::AppConfig;
use crate::services::{import_csv, EastMoneyClient, FundSync};
use std::path::PathBuf;
use tracing::warn;

/// Load the store, bootstrap it when empty, save, then write both reports
pub fn run(local: bool, file: Option<PathBuf>) {
    let config = load_config(local);
    println!("🚀 Running fund pipeline ({} store)", config.backend.as_str());

    let runtime = new_runtime();
    match runtime.block_on(run_pipeline(&config, file)) {
        Ok(()) => println!("\n✅ Pipeline completed successfully!"),
        Err(e) => {
            eprintln!("\n❌ Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_pipeline(config: &AppConfig, file: Option<PathBuf>) -> Result<()> {
    let mut store = open_store(config).await?;

    if store.is_empty() {
        warn!("Empty store, injecting data");
        println!("⚠️  Store is empty, bootstrapping...");

        match file {
            Some(path) => {
                println!("📁 Importing {}", path.display());
                let records = import_csv(&path)?;
                let merged = store.merge(&records).await?;
                println!("   {} rows merged", merged);
            }
            None => {
                let client = EastMoneyClient::new(config.fetch.clone())?;
                let mut sync = FundSync::new(
                    client,
                    config.fetch.fund_count,
                    Some(config.data_dir.clone()),
                );
                let funds = sync.resolve_funds(&[]).await?;
                println!("📥 Fetching {} funds from EastMoney...", funds.len());
                let stats = sync.sync_funds(&mut store, &funds).await?;
                print_ingest_summary(stats);
            }
        }

        store.save().await?;
    }

    let records = store.all_records();
    store.close().await;
    write_reports(&records, config)?;
    Ok(())
}
