use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One fund's net asset value on one trading day
///
/// # Return Format
/// `daily_return` is a plain fraction: 0.0031 means +0.31%.
///
/// The earliest known trading day of a fund carries a return of 0, since there
/// is no prior day to compare against.
///
/// **Rule**: `(fund_code, trading_day)` is unique within a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavRecord {
    /// Fund identifier (e.g., "000001")
    pub fund_code: String,

    /// Display name of the fund
    pub fund_name: String,

    /// Trading day (ISO `YYYY-MM-DD`)
    pub trading_day: NaiveDate,

    /// Unit NAV; some sources publish an empty value for it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_nav: Option<f64>,

    /// Cumulative NAV, inclusive of reinvested distributions
    pub cum_nav: f64,

    /// Daily return as a fraction
    pub daily_return: f64,
}

impl NavRecord {
    pub fn new(
        fund_code: String,
        fund_name: String,
        trading_day: NaiveDate,
        unit_nav: Option<f64>,
        cum_nav: f64,
        daily_return: f64,
    ) -> Self {
        Self {
            fund_code,
            fund_name,
            trading_day,
            unit_nav,
            cum_nav,
            daily_return,
        }
    }

    /// Daily return derived from two consecutive cumulative NAV values:
    /// `(current - previous) / previous`
    pub fn derive_return(current_cum_nav: f64, previous_cum_nav: f64) -> f64 {
        (current_cum_nav - previous_cum_nav) / previous_cum_nav
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_return() {
        let r = NavRecord::derive_return(102.0, 100.0);
        assert!((r - 0.02).abs() < 1e-12);

        let r = NavRecord::derive_return(99.0, 102.0);
        assert!((r - (-3.0 / 102.0)).abs() < 1e-12);
    }
}
