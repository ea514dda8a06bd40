use serde::{Deserialize, Serialize};
use std::fmt;

/// Report granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportGranularity {
    /// One row per fund lifetime plus one per calendar year -> year_repo.csv
    Annual,
    /// One row per (year, month) -> month_repo.csv
    Monthly,
}

impl ReportGranularity {
    /// Convert to report filename
    pub fn to_filename(&self) -> &'static str {
        match self {
            ReportGranularity::Annual => crate::constants::YEAR_REPORT_FILE,
            ReportGranularity::Monthly => crate::constants::MONTH_REPORT_FILE,
        }
    }
}

impl fmt::Display for ReportGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportGranularity::Annual => write!(f, "annual"),
            ReportGranularity::Monthly => write!(f, "monthly"),
        }
    }
}

/// Period a metrics row covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    /// Whole fund history
    Lifetime,
    /// Calendar year
    Year(i32),
    /// Calendar (year, month)
    Month(i32, u32),
}

impl PeriodKey {
    /// Year column as written to the report ("ALL" for the lifetime row)
    pub fn year_label(&self) -> String {
        match self {
            PeriodKey::Lifetime => crate::constants::LIFETIME_PERIOD.to_string(),
            PeriodKey::Year(year) | PeriodKey::Month(year, _) => format!("{:04}", year),
        }
    }

    /// Month column as written to the monthly report
    pub fn month_label(&self) -> Option<String> {
        match self {
            PeriodKey::Month(_, month) => Some(format!("{:02}", month)),
            _ => None,
        }
    }
}

/// Figures computed over the whole history of one fund
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifetimeMetrics {
    /// Compounded return over every row
    pub total_return: f64,

    /// Calendar days between the first and last trading day
    pub age_days: i64,

    /// `total_return / age_days * calendar_days_per_year`; `None` when `age_days == 0`
    pub annualized_return: Option<f64>,

    /// `None` when the annualized return is undefined or volatility is zero
    pub sharpe_ratio: Option<f64>,

    /// `min(cum_nav) - 1`
    pub max_drawdown: f64,
}

/// One report row for a (fund, period) bucket
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodMetrics {
    pub fund_code: String,
    pub fund_name: String,
    pub period: PeriodKey,

    /// Compounded return over the bucket, excluding its earliest row
    pub period_return: f64,

    /// Lifetime annualized return, repeated on every annual row
    pub annualized_return: Option<f64>,

    /// Annual rows only; computed over the row's own bucket
    pub sharpe_ratio: Option<f64>,

    /// Annual rows only; lowest cumulative NAV of the bucket minus 1
    pub max_drawdown: Option<f64>,
}

/// Row layout of year_repo.csv
#[derive(Debug, Serialize)]
pub struct AnnualReportRow<'a> {
    #[serde(rename = "Code")]
    pub code: &'a str,
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Return")]
    pub period_return: f64,
    #[serde(rename = "YearReturn")]
    pub annualized_return: Option<f64>,
    #[serde(rename = "Sharpe")]
    pub sharpe_ratio: Option<f64>,
    #[serde(rename = "MaxDrawDown")]
    pub max_drawdown: Option<f64>,
}

/// Row layout of month_repo.csv
#[derive(Debug, Serialize)]
pub struct MonthlyReportRow<'a> {
    #[serde(rename = "Code")]
    pub code: &'a str,
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Return")]
    pub period_return: f64,
}

impl PeriodMetrics {
    pub fn to_annual_row(&self) -> AnnualReportRow<'_> {
        AnnualReportRow {
            code: &self.fund_code,
            name: &self.fund_name,
            year: self.period.year_label(),
            period_return: self.period_return,
            annualized_return: self.annualized_return,
            sharpe_ratio: self.sharpe_ratio,
            max_drawdown: self.max_drawdown,
        }
    }

    pub fn to_monthly_row(&self) -> MonthlyReportRow<'_> {
        MonthlyReportRow {
            code: &self.fund_code,
            name: &self.fund_name,
            year: self.period.year_label(),
            month: self.period.month_label().unwrap_or_default(),
            period_return: self.period_return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_labels() {
        assert_eq!(PeriodKey::Lifetime.year_label(), "ALL");
        assert_eq!(PeriodKey::Year(2021).year_label(), "2021");
        assert_eq!(PeriodKey::Month(2021, 3).year_label(), "2021");
        assert_eq!(PeriodKey::Month(2021, 3).month_label(), Some("03".to_string()));
        assert_eq!(PeriodKey::Year(2021).month_label(), None);
    }

    #[test]
    fn test_period_ordering() {
        // Lifetime row sorts ahead of per-year rows
        let mut keys = vec![PeriodKey::Year(2022), PeriodKey::Lifetime, PeriodKey::Year(2020)];
        keys.sort();
        assert_eq!(keys, vec![PeriodKey::Lifetime, PeriodKey::Year(2020), PeriodKey::Year(2022)]);
    }
}
