use crate::commands::{load_config, new_runtime, open_store, print_ingest_summary};
use crate::error::Result;
use crate::models::AppConfig;
use crate::services::{EastMoneyClient, FundSync};

pub fn run(local: bool, codes: Vec<String>, no_export: bool) {
    let config = load_config(local);

    if codes.is_empty() {
        println!(
            "📋 No codes given, ingesting the first {} funds of the directory",
            config.fetch.fund_count
        );
    } else {
        println!("📋 Ingesting {} funds: {}", codes.len(), codes.join(", "));
    }

    let runtime = new_runtime();
    match runtime.block_on(ingest(&config, &codes, no_export)) {
        Ok(failed) if failed > 0 => {
            println!("\n⚠️  Ingestion completed with {} failed funds", failed);
        }
        Ok(_) => println!("\n✅ Ingestion completed successfully!"),
        Err(e) => {
            eprintln!("\n❌ Ingestion failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns the number of funds that failed
async fn ingest(config: &AppConfig, codes: &[String], no_export: bool) -> Result<usize> {
    let mut store = open_store(config).await?;

    let client = EastMoneyClient::new(config.fetch.clone())?;
    let export_dir = (!no_export).then(|| config.data_dir.clone());
    let mut sync = FundSync::new(client, config.fetch.fund_count, export_dir);

    let funds = sync.resolve_funds(codes).await?;
    let stats = sync.sync_funds(&mut store, &funds).await?;
    print_ingest_summary(stats);
    let failed = stats.failed;

    store.save().await?;
    store.close().await;
    Ok(failed)
}
