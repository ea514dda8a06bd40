//! Sink trait for the time-series store
//!
//! Defines the interface both persistence back-ends implement. The store owns
//! one boxed sink and never branches on which one it is.

use crate::error::Result;
use crate::models::{AppConfig, NavRecord, StoreBackend};
use crate::services::csv_sink::CsvSink;
use crate::services::sqlite_sink::SqliteSink;
use async_trait::async_trait;
use std::path::Path;

/// Persistence back-end for [`TimeSeriesStore`](crate::services::TimeSeriesStore)
#[async_trait]
pub trait StoreSink: Send {
    /// Read every persisted row; a sink that does not exist yet yields no rows
    async fn load(&mut self) -> Result<Vec<NavRecord>>;

    /// Persist newly merged rows (append-only); may be deferred until `flush`
    async fn append(&mut self, records: &[NavRecord]) -> Result<()>;

    /// Make pending state durable; `all_records` is the full working table
    async fn flush(&mut self, all_records: &[NavRecord]) -> Result<()>;

    /// Release held resources; anything not flushed is discarded
    async fn close(&mut self) {}

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;

    /// File backing this sink
    fn location(&self) -> &Path;
}

/// Build the sink selected by configuration
pub fn open_sink(config: &AppConfig) -> Box<dyn StoreSink> {
    match config.backend {
        StoreBackend::Csv => Box::new(CsvSink::new(
            config.data_dir.join(crate::constants::LOCAL_DB_FILE),
        )),
        StoreBackend::Sqlite => Box::new(SqliteSink::new(config.database_path.clone())),
    }
}
