use crate::error::{AppError, Result};
use crate::models::{
    LifetimeMetrics, MetricsConfig, NavRecord, PeriodKey, PeriodMetrics, ReportGranularity,
};
use chrono::Datelike;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Service for turning NAV histories into period performance reports
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Build the report rows for every fund in `records`
    ///
    /// # Arguments
    /// * `records` - Cross-fund NAV rows, in any order
    /// * `granularity` - Annual (lifetime row plus one per year) or Monthly
    /// * `config` - Risk-free rate and day-count constants
    ///
    /// # Returns
    /// Rows ordered by fund code, then period
    pub fn build_report(
        records: &[NavRecord],
        granularity: ReportGranularity,
        config: &MetricsConfig,
    ) -> Vec<PeriodMetrics> {
        let funds = Self::group_by_fund(records);
        debug!(
            "Building {} report for {} funds from {} rows",
            granularity,
            funds.len(),
            records.len()
        );

        let mut report = Vec::new();
        for (fund_code, rows) in funds {
            match Self::build_fund_report(fund_code, rows, granularity, config) {
                Ok(rows) => report.extend(rows),
                Err(e) => warn!(fund_code = %fund_code, "Skipping fund: {}", e),
            }
        }

        info!("Built {} report with {} rows", granularity, report.len());
        report
    }

    /// Report rows for a single fund
    ///
    /// Fails with `EmptyHistory` when `rows` is empty.
    pub fn build_fund_report(
        fund_code: &str,
        mut rows: Vec<&NavRecord>,
        granularity: ReportGranularity,
        config: &MetricsConfig,
    ) -> Result<Vec<PeriodMetrics>> {
        if rows.is_empty() {
            return Err(AppError::EmptyHistory(fund_code.to_string()));
        }
        rows.sort_by_key(|r| r.trading_day);

        let buckets = match granularity {
            ReportGranularity::Annual => Self::group_by_year(&rows),
            ReportGranularity::Monthly => Self::group_by_month(&rows),
        };

        let mut result = Vec::with_capacity(buckets.len() + 1);
        match granularity {
            ReportGranularity::Annual => {
                // Newest row carries the current display name
                let fund_name = Self::newest_name(&rows);
                let lifetime = Self::lifetime_metrics(&rows, config)?;

                result.push(PeriodMetrics {
                    fund_code: fund_code.to_string(),
                    fund_name: fund_name.clone(),
                    period: PeriodKey::Lifetime,
                    period_return: lifetime.total_return,
                    annualized_return: lifetime.annualized_return,
                    sharpe_ratio: lifetime.sharpe_ratio,
                    max_drawdown: Some(lifetime.max_drawdown),
                });
                for (period, bucket) in &buckets {
                    let period_return = Self::period_return(bucket);
                    result.push(PeriodMetrics {
                        fund_code: fund_code.to_string(),
                        fund_name: fund_name.clone(),
                        period: *period,
                        period_return,
                        annualized_return: lifetime.annualized_return,
                        sharpe_ratio: Self::sharpe_ratio(period_return, bucket, config),
                        max_drawdown: Some(Self::max_drawdown(bucket)),
                    });
                }
            }
            ReportGranularity::Monthly => {
                for (period, bucket) in &buckets {
                    result.push(PeriodMetrics {
                        fund_code: fund_code.to_string(),
                        fund_name: Self::newest_name(bucket),
                        period: *period,
                        period_return: Self::period_return(bucket),
                        annualized_return: None,
                        sharpe_ratio: None,
                        max_drawdown: None,
                    });
                }
            }
        }

        Ok(result)
    }

    /// Compounded return of a bucket, ignoring the return of its earliest row
    ///
    /// `rows` must be in ascending trading-day order. The earliest row's return
    /// relates to the previous bucket, so a single-row bucket yields 0.
    pub fn period_return(rows: &[&NavRecord]) -> f64 {
        rows.iter()
            .skip(1)
            .fold(1.0, |acc, r| acc * (1.0 + r.daily_return))
            - 1.0
    }

    /// Compounded return over every row
    pub fn compounded_return(rows: &[&NavRecord]) -> f64 {
        rows.iter().fold(1.0, |acc, r| acc * (1.0 + r.daily_return)) - 1.0
    }

    /// Whole-history figures for one fund; `rows` in ascending trading-day order
    pub fn lifetime_metrics(rows: &[&NavRecord], config: &MetricsConfig) -> Result<LifetimeMetrics> {
        let (first, last) = match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(AppError::EmptyHistory(String::new())),
        };

        let total_return = Self::compounded_return(rows);
        let age_days = (last.trading_day - first.trading_day).num_days();

        // Simple linear annualization, not CAGR
        let annualized_return = (age_days > 0)
            .then(|| total_return / age_days as f64 * config.calendar_days_per_year)
            .filter(|v| v.is_finite());

        let sharpe_ratio =
            annualized_return.and_then(|annualized| Self::sharpe_ratio(annualized, rows, config));
        let max_drawdown = Self::max_drawdown(rows);

        Ok(LifetimeMetrics {
            total_return,
            age_days,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
        })
    }

    /// Excess `period_return` over the annualized volatility of `rows`
    ///
    /// `None` when the returns are flat or the ratio is not finite.
    pub fn sharpe_ratio(period_return: f64, rows: &[&NavRecord], config: &MetricsConfig) -> Option<f64> {
        let volatility = Self::population_std_dev(rows) * config.trading_days_per_year.sqrt();
        Some((period_return - config.risk_free_rate) / volatility)
            .filter(|_| volatility > 0.0)
            .filter(|v| v.is_finite())
    }

    /// Lowest cumulative NAV of `rows`, relative to 1
    pub fn max_drawdown(rows: &[&NavRecord]) -> f64 {
        rows.iter().map(|r| r.cum_nav).fold(f64::INFINITY, f64::min) - 1.0
    }

    fn newest_name(rows: &[&NavRecord]) -> String {
        rows.iter()
            .max_by_key(|r| r.trading_day)
            .map(|r| r.fund_name.clone())
            .unwrap_or_default()
    }

    /// Population standard deviation of the daily returns
    fn population_std_dev(rows: &[&NavRecord]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let n = rows.len() as f64;
        let mean = rows.iter().map(|r| r.daily_return).sum::<f64>() / n;
        let variance = rows
            .iter()
            .map(|r| (r.daily_return - mean).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }

    /// Group rows by fund code
    fn group_by_fund(records: &[NavRecord]) -> BTreeMap<&str, Vec<&NavRecord>> {
        let mut funds: BTreeMap<&str, Vec<&NavRecord>> = BTreeMap::new();
        for record in records {
            funds.entry(record.fund_code.as_str()).or_default().push(record);
        }
        funds
    }

    /// Group rows by calendar year, preserving their order
    fn group_by_year<'a>(rows: &[&'a NavRecord]) -> BTreeMap<PeriodKey, Vec<&'a NavRecord>> {
        let mut buckets: BTreeMap<PeriodKey, Vec<&NavRecord>> = BTreeMap::new();
        for record in rows {
            buckets
                .entry(PeriodKey::Year(record.trading_day.year()))
                .or_default()
                .push(*record);
        }
        buckets
    }

    /// Group rows by calendar (year, month), preserving their order
    fn group_by_month<'a>(rows: &[&'a NavRecord]) -> BTreeMap<PeriodKey, Vec<&'a NavRecord>> {
        let mut buckets: BTreeMap<PeriodKey, Vec<&NavRecord>> = BTreeMap::new();
        for record in rows {
            let day = record.trading_day;
            buckets
                .entry(PeriodKey::Month(day.year(), day.month()))
                .or_default()
                .push(*record);
        }
        buckets
    }
}
