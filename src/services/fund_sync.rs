//! Fund ingestion orchestrator
//!
//! Pulls fund histories from a [`NavSource`], normalizes them and merges them
//! into the store one fund at a time. A failing fund is logged and counted;
//! a failing store stops the run.

use crate::error::Result;
use crate::models::{IngestStats, NavRecord};
use crate::services::eastmoney::FundListItem;
use crate::services::normalizer::{normalize, RawNavEntry};
use crate::services::report_writer::export_fund;
use crate::services::time_series_store::TimeSeriesStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Remote supplier of fund directories and raw NAV histories
#[async_trait]
pub trait NavSource: Send + Sync {
    /// Full fund directory, in the source's order
    async fn fund_list(&self) -> Result<Vec<FundListItem>>;

    /// Every raw NAV entry of one fund
    async fn history(&self, fund_code: &str) -> Result<Vec<RawNavEntry>>;
}

pub struct FundSync<S: NavSource> {
    source: S,
    fund_count: usize,
    /// Directory for per-fund exports; `None` disables them
    export_dir: Option<PathBuf>,
    stats: IngestStats,
}

impl<S: NavSource> FundSync<S> {
    pub fn new(source: S, fund_count: usize, export_dir: Option<PathBuf>) -> Self {
        Self {
            source,
            fund_count,
            export_dir,
            stats: IngestStats::new(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Funds to ingest: the given codes, or the head of the directory when none are given
    ///
    /// Names of explicit codes are looked up in the directory; a code missing
    /// from it (or an unreachable directory) falls back to the code as name.
    pub async fn resolve_funds(&self, codes: &[String]) -> Result<Vec<FundListItem>> {
        if codes.is_empty() {
            let mut funds = self.source.fund_list().await?;
            funds.truncate(self.fund_count);
            info!("Selected first {} funds of the directory", funds.len());
            return Ok(funds);
        }

        let directory: HashMap<String, FundListItem> = match self.source.fund_list().await {
            Ok(funds) => funds.into_iter().map(|f| (f.fund_code.clone(), f)).collect(),
            Err(e) => {
                warn!("Fund directory unavailable, using codes as names: {}", e);
                HashMap::new()
            }
        };

        Ok(codes
            .iter()
            .map(|code| {
                directory.get(code).cloned().unwrap_or_else(|| {
                    warn!(fund_code = %code, "Fund not found in directory");
                    FundListItem {
                        fund_code: code.clone(),
                        fund_name: code.clone(),
                        fund_type: String::new(),
                    }
                })
            })
            .collect())
    }

    /// Fetch and normalize one fund's complete history
    pub async fn fetch_fund(&self, fund: &FundListItem) -> Result<Vec<NavRecord>> {
        let entries = self.source.history(&fund.fund_code).await?;
        normalize(&fund.fund_code, &fund.fund_name, &entries)
    }

    /// Ingest `funds` sequentially into `store`
    ///
    /// Fund-scoped failures (fetch, parse, normalization, export) are logged
    /// and counted. A merge failure is returned immediately.
    pub async fn sync_funds(
        &mut self,
        store: &mut TimeSeriesStore,
        funds: &[FundListItem],
    ) -> Result<&IngestStats> {
        let start = Instant::now();
        info!("Ingesting {} funds", funds.len());

        for (index, fund) in funds.iter().enumerate() {
            info!(
                fund_code = %fund.fund_code,
                fund_type = %fund.fund_type,
                "[{}/{}] Fetching {}",
                index + 1,
                funds.len(),
                fund.fund_name
            );

            let records = match self.fetch_fund(fund).await {
                Ok(records) => records,
                Err(e) => {
                    error!(fund_code = %fund.fund_code, "Fund ingestion failed: {}", e);
                    self.stats.failed += 1;
                    continue;
                }
            };

            if records.is_empty() {
                warn!(fund_code = %fund.fund_code, "Source returned no NAV history");
            }

            let merged = store.merge(&records).await?;
            self.stats.successful += 1;
            self.stats.fetched_records += records.len();
            self.stats.merged_records += merged;

            if let Some(dir) = &self.export_dir {
                if !records.is_empty() {
                    if let Err(e) = export_fund(dir, &fund.fund_code, &fund.fund_name, &records) {
                        warn!(fund_code = %fund.fund_code, "Export failed: {}", e);
                    }
                }
            }
        }

        info!(
            successful = self.stats.successful,
            failed = self.stats.failed,
            merged = self.stats.merged_records,
            "Ingestion finished in {:.1}s",
            start.elapsed().as_secs_f64()
        );
        Ok(&self.stats)
    }
}
