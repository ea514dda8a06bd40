//! Flat-file back-end: the whole table lives in one CSV file that is
//! rewritten on every flush.

use crate::error::{AppError, Result};
use crate::models::NavRecord;
use crate::services::csv_parser::{parse_persisted_row, read_rows, write_records};
use crate::services::store_sink::StoreSink;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("csv.tmp")
    }
}

#[async_trait]
impl StoreSink for CsvSink {
    async fn load(&mut self) -> Result<Vec<NavRecord>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "Local store file not found, starting empty");
            return Ok(Vec::new());
        }

        let rows = read_rows(&self.path)?;
        let records = rows
            .iter()
            .map(|row| parse_persisted_row(row, &self.path))
            .collect::<Result<Vec<_>>>()?;

        info!(path = %self.path.display(), rows = records.len(), "Loaded local store file");
        Ok(records)
    }

    async fn append(&mut self, records: &[NavRecord]) -> Result<()> {
        // Rows stay in the working table until the next flush
        debug!(rows = records.len(), "Deferred append to local store file");
        Ok(())
    }

    async fn flush(&mut self, all_records: &[NavRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    error!(path = %parent.display(), error = %e, "Failed to create store directory");
                    AppError::SourceUnavailable(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        // Sibling temp file, then rename over the store
        let temp_path = self.temp_path();
        let written = write_records(&temp_path, all_records)?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            AppError::Io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!(path = %self.path.display(), rows = written, "Rewrote local store file");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "csv"
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
