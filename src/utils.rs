pub mod deduplication;

use crate::constants::DEFAULT_DATABASE_FILE;
use std::path::PathBuf;

/// Get fund data directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("FUND_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Get SQLite database path from environment variable or use default
pub fn get_database_path() -> PathBuf {
    std::env::var("FUND_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_FILE))
}

/// Read an environment variable and parse it, falling back to `default` when unset
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
