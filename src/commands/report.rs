use crate::commands::{load_config, new_runtime, open_store};
use crate::error::Result;
use crate::models::{AppConfig, NavRecord, ReportGranularity};
use crate::services::{write_report_file, MetricsAggregator};
use std::path::PathBuf;

pub fn run(local: bool) {
    let config = load_config(local);
    let runtime = new_runtime();

    let result = runtime.block_on(async {
        let store = open_store(&config).await?;
        if store.is_empty() {
            println!("⚠️  Store is empty. Run 'ingest' or 'import' first.");
        }
        let records = store.all_records();
        store.close().await;
        write_reports(&records, &config)
    });

    if let Err(e) = result {
        eprintln!("\n❌ Report failed: {}", e);
        std::process::exit(1);
    }
}

/// Build both reports from `records` and write them into the data directory
pub(crate) fn write_reports(records: &[NavRecord], config: &AppConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for granularity in [ReportGranularity::Annual, ReportGranularity::Monthly] {
        let rows = MetricsAggregator::build_report(records, granularity, &config.metrics);
        let path = write_report_file(&config.data_dir, granularity, &rows)?;
        println!("📄 {} report: {} rows → {}", granularity, rows.len(), path.display());
        written.push(path);
    }

    Ok(written)
}
