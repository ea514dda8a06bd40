//! Time-Series Store
//!
//! Holds the full cross-fund NAV history for one run and keeps it in sync with
//! a single [`StoreSink`]. Rows are keyed by `(fund_code, trading_day)`; merges
//! only ever append keys that are not present yet.

use crate::error::Result;
use crate::models::{AppConfig, NavRecord};
use crate::services::store_sink::{open_sink, StoreSink};
use crate::utils::deduplication::{
    count_duplicates, get_duplicate_info, NavKey, RecordDeduplicator,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

pub struct TimeSeriesStore {
    sink: Box<dyn StoreSink>,
    records: Vec<NavRecord>,
    keys: RecordDeduplicator,
    /// Rows merged since the last load/save
    pending: usize,
}

impl TimeSeriesStore {
    pub fn new(sink: Box<dyn StoreSink>) -> Self {
        Self {
            sink,
            records: Vec::new(),
            keys: RecordDeduplicator::new(),
            pending: 0,
        }
    }

    /// Create a store over the back-end selected by configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(open_sink(config))
    }

    /// Replace the working table with the sink's contents
    ///
    /// A sink that does not exist yet leaves the store empty. Malformed
    /// persisted rows fail the whole load.
    pub async fn load(&mut self) -> Result<()> {
        let loaded = self.sink.load().await.map_err(|e| {
            error!(
                backend = self.sink.backend_type(),
                location = %self.sink.location().display(),
                error = %e,
                "Failed to load store"
            );
            e
        })?;

        let duplicates = count_duplicates(&loaded);
        if duplicates > 0 {
            warn!(
                duplicates,
                "Persisted data holds duplicate (Code, TradingDay) keys, keeping first occurrence"
            );
            for (key, count) in get_duplicate_info(&loaded).iter().take(10) {
                debug!(fund_code = %key.fund_code, trading_day = %key.trading_day, count, "Duplicate key");
            }
        }

        let mut keys = RecordDeduplicator::new();
        let records = keys.filter_new(&loaded);

        info!(
            backend = self.sink.backend_type(),
            rows = records.len(),
            "Store loaded"
        );
        self.records = records;
        self.keys = keys;
        self.pending = 0;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Append the rows of `batch` whose key is not stored yet
    ///
    /// Keys repeated inside `batch` keep their first occurrence. Returns the
    /// number of rows appended; merging the same batch again appends nothing.
    pub async fn merge(&mut self, batch: &[NavRecord]) -> Result<usize> {
        let mut batch_keys = HashSet::new();
        let new: Vec<NavRecord> = batch
            .iter()
            .filter(|record| !self.keys.contains(record) && batch_keys.insert(NavKey::of(record)))
            .cloned()
            .collect();

        if new.is_empty() {
            debug!(batch = batch.len(), "Nothing new to merge");
            return Ok(0);
        }

        self.sink.append(&new).await.map_err(|e| {
            error!(
                backend = self.sink.backend_type(),
                rows = new.len(),
                error = %e,
                "Failed to append merged rows"
            );
            e
        })?;

        // Register keys only after the sink accepted the rows
        let appended = self.keys.filter_new(&new).len();
        self.records.extend(new);
        self.pending += appended;

        debug!(batch = batch.len(), appended, "Merged batch into store");
        Ok(appended)
    }

    /// Flush pending state to the sink; a no-op when nothing was merged
    pub async fn save(&mut self) -> Result<()> {
        if self.pending == 0 {
            debug!("No pending rows, skipping save");
            return Ok(());
        }

        self.sink.flush(&self.records).await.map_err(|e| {
            error!(
                backend = self.sink.backend_type(),
                location = %self.sink.location().display(),
                error = %e,
                "Failed to save store"
            );
            e
        })?;

        info!(
            backend = self.sink.backend_type(),
            rows = self.records.len(),
            saved = self.pending,
            "Store saved"
        );
        self.pending = 0;
        Ok(())
    }

    /// Private copy of the full working table
    pub fn all_records(&self) -> Vec<NavRecord> {
        self.records.clone()
    }

    /// Rows merged but not yet saved
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn backend_type(&self) -> &'static str {
        self.sink.backend_type()
    }

    pub fn location(&self) -> &Path {
        self.sink.location()
    }

    /// Close the sink; rows merged since the last save are discarded
    pub async fn close(mut self) {
        if self.pending > 0 {
            warn!(pending = self.pending, "Closing store with unsaved rows");
        }
        self.sink.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreBackend;
    use chrono::NaiveDate;
    use tempfile::{tempdir, TempDir};

    fn record(code: &str, day: u32, cum_nav: f64) -> NavRecord {
        NavRecord::new(
            code.to_string(),
            format!("Fund {}", code),
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            Some(cum_nav),
            cum_nav,
            0.0,
        )
    }

    fn config(dir: &TempDir, backend: StoreBackend) -> AppConfig {
        AppConfig {
            data_dir: dir.path().join("data"),
            backend,
            database_path: dir.path().join("EMFund.db"),
            ..AppConfig::default()
        }
    }

    fn sorted(mut records: Vec<NavRecord>) -> Vec<NavRecord> {
        records.sort_by(|a, b| {
            (a.fund_code.as_str(), a.trading_day).cmp(&(b.fund_code.as_str(), b.trading_day))
        });
        records
    }

    #[tokio::test]
    async fn test_empty_bootstrap() {
        for backend in [StoreBackend::Csv, StoreBackend::Sqlite] {
            let dir = tempdir().unwrap();
            let mut store = TimeSeriesStore::from_config(&config(&dir, backend));
            store.load().await.unwrap();
            assert!(store.is_empty());
            // Saving an untouched store is not an error
            store.save().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut store = TimeSeriesStore::from_config(&config(&dir, StoreBackend::Csv));
        store.load().await.unwrap();

        let batch = vec![record("000001", 1, 1.0), record("000001", 4, 1.1)];
        assert_eq!(store.merge(&batch).await.unwrap(), 2);
        let once = store.all_records();

        assert_eq!(store.merge(&batch).await.unwrap(), 0);
        assert_eq!(store.all_records(), once);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_batches_keep_first_value() {
        let dir = tempdir().unwrap();
        let mut store = TimeSeriesStore::from_config(&config(&dir, StoreBackend::Sqlite));
        store.load().await.unwrap();

        let first = vec![record("000001", 1, 1.0), record("000001", 4, 1.1)];
        let second = vec![record("000001", 4, 9.9), record("000001", 5, 1.2), record("000001", 5, 7.7)];
        store.merge(&first).await.unwrap();
        assert_eq!(store.merge(&second).await.unwrap(), 1);

        let records = sorted(store.all_records());
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].cum_nav, 1.1);
        assert_eq!(records[2].cum_nav, 1.2);
    }

    #[tokio::test]
    async fn test_all_records_is_a_copy() {
        let dir = tempdir().unwrap();
        let mut store = TimeSeriesStore::from_config(&config(&dir, StoreBackend::Csv));
        store.merge(&[record("000001", 1, 1.0)]).await.unwrap();

        let mut copy = store.all_records();
        copy[0].cum_nav = 5.0;
        copy.clear();
        assert_eq!(store.all_records()[0].cum_nav, 1.0);
    }

    #[tokio::test]
    async fn test_save_and_reload_both_backends() {
        for backend in [StoreBackend::Csv, StoreBackend::Sqlite] {
            let dir = tempdir().unwrap();
            let config = config(&dir, backend);
            let batch = vec![
                record("000001", 1, 1.0),
                record("000001", 4, 1.1),
                record("110022", 1, 2.0),
            ];

            let mut store = TimeSeriesStore::from_config(&config);
            store.load().await.unwrap();
            store.merge(&batch).await.unwrap();
            assert_eq!(store.pending(), 3);
            store.save().await.unwrap();
            assert_eq!(store.pending(), 0);
            store.close().await;

            let mut reopened = TimeSeriesStore::from_config(&config);
            reopened.load().await.unwrap();
            assert_eq!(sorted(reopened.all_records()), sorted(batch.clone()));

            // Re-merging after reload appends nothing
            assert_eq!(reopened.merge(&batch).await.unwrap(), 0);
            reopened.save().await.unwrap();
            reopened.close().await;
        }
    }
}
