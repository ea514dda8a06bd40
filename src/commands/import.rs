use crate::commands::{load_config, new_runtime, open_store};
use crate::error::Result;
use crate::models::AppConfig;
use crate::services::import_csv;
use std::path::{Path, PathBuf};

pub fn run(file: PathBuf, local: bool) {
    let config = load_config(local);
    println!("📁 Source file: {}", file.display());

    if !file.is_file() {
        eprintln!("❌ Error: Source file does not exist: {}", file.display());
        std::process::exit(1);
    }

    let runtime = new_runtime();
    match runtime.block_on(import(&config, &file)) {
        Ok((read, merged)) => {
            println!("   {} rows read, {} new, {} already stored", read, merged, read - merged);
            println!("\n🎉 Import completed successfully!");
        }
        Err(e) => {
            eprintln!("\n❌ Import failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn import(config: &AppConfig, file: &Path) -> Result<(usize, usize)> {
    let records = import_csv(file)?;
    let mut store = open_store(config).await?;
    let merged = store.merge(&records).await?;
    store.save().await?;
    store.close().await;
    Ok((records.len(), merged))
}
