use crate::constants::{
    DEFAULT_CALENDAR_DAYS_PER_YEAR, DEFAULT_FUND_COUNT, DEFAULT_PAGE_SIZE,
    DEFAULT_REQUEST_DELAY_MS, DEFAULT_RISK_FREE_RATE, DEFAULT_TRADING_DAYS_PER_YEAR,
};
use crate::error::{AppError, Result};
use crate::utils::{env_or, get_data_dir, get_database_path};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Persistence back-end for the time-series store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    /// Whole table rewritten to <data_dir>/local_db.csv on save
    Csv,
    /// Rows appended to the "Return" table, committed on save
    Sqlite,
}

impl StoreBackend {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "csv" | "local" | "file" => Ok(StoreBackend::Csv),
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            _ => Err(format!("Invalid store backend: {}. Valid options: csv, sqlite", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Csv => "csv",
            StoreBackend::Sqlite => "sqlite",
        }
    }
}

/// Settings for the remote NAV source
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Rows per page for the paginated history endpoint
    pub page_size: usize,

    /// Number of funds to ingest when bootstrapping an empty store
    pub fund_count: usize,

    /// Politeness delay before each page request
    pub request_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fund_count: DEFAULT_FUND_COUNT,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}

/// Constants used by the metrics aggregator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    /// Annualized risk-free rate (0.025 = 2.5%)
    pub risk_free_rate: f64,

    /// Trading days per year, scales daily volatility
    pub trading_days_per_year: f64,

    /// Calendar days per year, used for linear annualization
    pub calendar_days_per_year: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
            calendar_days_per_year: DEFAULT_CALENDAR_DAYS_PER_YEAR,
        }
    }
}

/// Run configuration, resolved from the environment and CLI flags
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory for the flat-file store, exports and reports
    pub data_dir: PathBuf,

    /// Selected store back-end
    pub backend: StoreBackend,

    /// SQLite database file (sqlite back-end only)
    pub database_path: PathBuf,

    pub fetch: FetchConfig,

    pub metrics: MetricsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: StoreBackend::Sqlite,
            database_path: PathBuf::from(crate::constants::DEFAULT_DATABASE_FILE),
            fetch: FetchConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to defaults
    ///
    /// `local` forces the CSV back-end regardless of `FUND_STORE_BACKEND`.
    pub fn from_env(local: bool) -> Result<Self> {
        let backend = if local {
            StoreBackend::Csv
        } else {
            match std::env::var("FUND_STORE_BACKEND") {
                Ok(raw) => StoreBackend::from_str(&raw).map_err(AppError::Config)?,
                Err(_) => StoreBackend::Sqlite,
            }
        };

        let fetch = FetchConfig {
            page_size: env_or("FUND_PAGE_SIZE", DEFAULT_PAGE_SIZE).map_err(AppError::Config)?,
            fund_count: env_or("FUND_COUNT", DEFAULT_FUND_COUNT).map_err(AppError::Config)?,
            request_delay: Duration::from_millis(
                env_or("FUND_REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS)
                    .map_err(AppError::Config)?,
            ),
        };

        let metrics = MetricsConfig {
            risk_free_rate: env_or("FUND_RISK_FREE_RATE", DEFAULT_RISK_FREE_RATE)
                .map_err(AppError::Config)?,
            trading_days_per_year: env_or("FUND_TRADING_DAYS", DEFAULT_TRADING_DAYS_PER_YEAR)
                .map_err(AppError::Config)?,
            calendar_days_per_year: env_or("FUND_CALENDAR_DAYS", DEFAULT_CALENDAR_DAYS_PER_YEAR)
                .map_err(AppError::Config)?,
        };

        let config = Self {
            data_dir: get_data_dir(),
            backend,
            database_path: get_database_path(),
            fetch,
            metrics,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make pagination or annualization meaningless
    pub fn validate(&self) -> Result<()> {
        if self.fetch.page_size == 0 {
            return Err(AppError::Config("page size must be positive".to_string()));
        }
        if self.metrics.trading_days_per_year <= 0.0 || self.metrics.calendar_days_per_year <= 0.0 {
            return Err(AppError::Config(
                "days-per-year constants must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Statistics for an ingestion run
#[derive(Debug, Default)]
pub struct IngestStats {
    pub successful: usize,
    pub failed: usize,
    pub fetched_records: usize,
    pub merged_records: usize,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_processed(&self) -> usize {
        self.successful + self.failed
    }

    /// Rows that were already present in the store
    pub fn duplicate_records(&self) -> usize {
        self.fetched_records.saturating_sub(self.merged_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_from_str() {
        assert_eq!(StoreBackend::from_str("csv").unwrap(), StoreBackend::Csv);
        assert_eq!(StoreBackend::from_str("LOCAL").unwrap(), StoreBackend::Csv);
        assert_eq!(StoreBackend::from_str("sqlite").unwrap(), StoreBackend::Sqlite);
        assert_eq!(StoreBackend::from_str(" db ").unwrap(), StoreBackend::Sqlite);
        assert!(StoreBackend::from_str("postgres").is_err());
    }

    #[test]
    fn test_default_constants() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.page_size, 1000);
        assert_eq!(config.fetch.fund_count, 20);
        assert_eq!(config.fetch.request_delay, Duration::from_millis(500));
        assert_eq!(config.metrics.risk_free_rate, 0.025);
        assert_eq!(config.metrics.trading_days_per_year, 252.0);
        assert_eq!(config.metrics.calendar_days_per_year, 365.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = AppConfig::default();
        config.fetch.page_size = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_ingest_stats() {
        let stats = IngestStats {
            successful: 3,
            failed: 1,
            fetched_records: 100,
            merged_records: 60,
        };
        assert_eq!(stats.total_processed(), 4);
        assert_eq!(stats.duplicate_records(), 40);
    }
}
