//! Record Normalizer
//!
//! Converts raw per-fund NAV entries into canonical [`NavRecord`] rows. Every
//! source goes through here before reaching the store.

use crate::constants::DATE_FORMAT;
use crate::error::{AppError, Result};
use crate::models::NavRecord;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

/// One raw NAV entry as delivered by a source
///
/// Field names follow the EastMoney history payload; fields outside this set
/// (including the source's rounded percentage growth `JZZZL`) are discarded on
/// deserialization so that returns are always derived from cumulative NAV.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNavEntry {
    #[serde(rename = "FSRQ", default)]
    pub trading_day: Option<String>,

    #[serde(rename = "DWJZ", default)]
    pub unit_nav: Option<String>,

    #[serde(rename = "LJJZ", default)]
    pub cum_nav: Option<String>,

    /// Precomputed return as a fraction; used verbatim when present
    #[serde(skip)]
    pub daily_return: Option<String>,
}

impl RawNavEntry {
    pub fn new(
        trading_day: &str,
        unit_nav: Option<&str>,
        cum_nav: &str,
        daily_return: Option<&str>,
    ) -> Self {
        Self {
            trading_day: Some(trading_day.to_string()),
            unit_nav: unit_nav.map(str::to_string),
            cum_nav: Some(cum_nav.to_string()),
            daily_return: daily_return.map(str::to_string),
        }
    }
}

/// Parsed entry before return derivation
struct ParsedEntry {
    trading_day: NaiveDate,
    unit_nav: Option<f64>,
    cum_nav: f64,
    daily_return: Option<f64>,
}

/// Treat missing and blank values alike
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(value: &str, field: &str, context: &str) -> Result<f64> {
    let parsed: f64 = value.parse().map_err(|_| {
        AppError::MalformedRecord(format!("{}: {} is not numeric: '{}'", context, field, value))
    })?;
    if !parsed.is_finite() {
        return Err(AppError::MalformedRecord(format!(
            "{}: {} is not finite: '{}'",
            context, field, value
        )));
    }
    Ok(parsed)
}

fn parse_entry(fund_code: &str, index: usize, entry: &RawNavEntry) -> Result<ParsedEntry> {
    let context = format!("fund {} entry {}", fund_code, index + 1);

    let day = non_blank(&entry.trading_day)
        .ok_or_else(|| AppError::MalformedRecord(format!("{}: missing trading date", context)))?;
    let trading_day = NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| {
        AppError::MalformedRecord(format!("{}: invalid trading date '{}'", context, day))
    })?;

    let cum_nav = non_blank(&entry.cum_nav)
        .ok_or_else(|| AppError::MalformedRecord(format!("{}: missing cumulative NAV", context)))
        .and_then(|v| parse_number(v, "cumulative NAV", &context))?;

    let unit_nav = non_blank(&entry.unit_nav)
        .map(|v| parse_number(v, "unit NAV", &context))
        .transpose()?;

    let daily_return = non_blank(&entry.daily_return)
        .map(|v| parse_number(v, "return", &context))
        .transpose()?;

    Ok(ParsedEntry {
        trading_day,
        unit_nav,
        cum_nav,
        daily_return,
    })
}

/// Normalize one fund's raw entries into canonical records, newest first
///
/// Entries carrying a return keep it verbatim. For the others the return is
/// derived from the next older entry: `(cum_nav[d] - cum_nav[d-1]) / cum_nav[d-1]`.
/// The oldest entry of the batch gets 0. A trading day listed more than once
/// keeps its first entry.
pub fn normalize(fund_code: &str, fund_name: &str, entries: &[RawNavEntry]) -> Result<Vec<NavRecord>> {
    let mut parsed = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(fund_code, index, entry))
        .collect::<Result<Vec<_>>>()?;

    // Newest first, as the source pages are delivered
    parsed.sort_by(|a, b| b.trading_day.cmp(&a.trading_day));
    let before = parsed.len();
    parsed.dedup_by_key(|e| e.trading_day);
    if parsed.len() < before {
        warn!(fund_code, dropped = before - parsed.len(), "Dropped repeated trading days");
    }

    let mut records = Vec::with_capacity(parsed.len());
    for (i, entry) in parsed.iter().enumerate() {
        let daily_return = match entry.daily_return {
            Some(value) => value,
            None => match parsed.get(i + 1) {
                Some(previous) => {
                    let derived = NavRecord::derive_return(entry.cum_nav, previous.cum_nav);
                    if !derived.is_finite() {
                        return Err(AppError::MalformedRecord(format!(
                            "fund {} {}: cannot derive return from cumulative NAV {} after {}",
                            fund_code, entry.trading_day, entry.cum_nav, previous.cum_nav
                        )));
                    }
                    derived
                }
                None => 0.0,
            },
        };

        records.push(NavRecord::new(
            fund_code.to_string(),
            fund_name.to_string(),
            entry.trading_day,
            entry.unit_nav,
            entry.cum_nav,
            daily_return,
        ));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: &str, cum_nav: &str) -> RawNavEntry {
        RawNavEntry::new(day, Some(cum_nav), cum_nav, None)
    }

    #[test]
    fn test_repeated_day_keeps_first_entry() {
        let entries = vec![
            entry("2024-01-04", "1.10"),
            entry("2024-01-03", "1.05"),
            RawNavEntry::new("2024-01-03", Some("1.05"), "1.05", Some("0.5")),
            entry("2024-01-02", "1.00"),
        ];

        let records = normalize("000001", "Alpha", &entries).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].trading_day, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert!((records[1].daily_return - 0.05).abs() < 1e-9);
        assert!((records[0].daily_return - 0.05 / 1.05).abs() < 1e-9);
        assert_eq!(records[2].daily_return, 0.0);
    }

    #[test]
    fn test_derives_returns_newest_first() {
        let entries = vec![
            entry("2024-01-04", "100"),
            entry("2024-01-03", "102"),
            entry("2024-01-02", "99"),
        ];

        let records = normalize("000001", "Test Fund", &entries).unwrap();
        assert_eq!(records.len(), 3);
        assert!((records[0].daily_return - (100.0 - 102.0) / 102.0).abs() < 1e-12);
        assert!((records[1].daily_return - (102.0 - 99.0) / 99.0).abs() < 1e-12);
        assert_eq!(records[2].daily_return, 0.0);
        assert_eq!(records[0].fund_name, "Test Fund");
    }

    #[test]
    fn test_orders_unsorted_input() {
        let entries = vec![
            entry("2024-01-02", "99"),
            entry("2024-01-04", "100"),
            entry("2024-01-03", "102"),
        ];

        let records = normalize("000001", "Test Fund", &entries).unwrap();
        assert_eq!(records[0].trading_day.to_string(), "2024-01-04");
        assert_eq!(records[2].trading_day.to_string(), "2024-01-02");
        assert_eq!(records[2].daily_return, 0.0);
    }

    #[test]
    fn test_supplied_return_used_verbatim() {
        let entries = vec![
            RawNavEntry::new("2024-01-03", Some("1.10"), "1.10", Some("0.5")),
            RawNavEntry::new("2024-01-02", Some("1.00"), "1.00", Some("0.25")),
        ];

        let records = normalize("000001", "Test Fund", &entries).unwrap();
        assert_eq!(records[0].daily_return, 0.5);
        assert_eq!(records[1].daily_return, 0.25);
    }

    #[test]
    fn test_blank_unit_nav_is_allowed() {
        let entries = vec![RawNavEntry::new("2024-01-02", Some(""), "1.0", None)];
        let records = normalize("000001", "Test Fund", &entries).unwrap();
        assert_eq!(records[0].unit_nav, None);
    }

    #[test]
    fn test_missing_cum_nav_is_malformed() {
        let entries = vec![RawNavEntry {
            trading_day: Some("2024-01-02".to_string()),
            unit_nav: Some("1.0".to_string()),
            cum_nav: Some("".to_string()),
            daily_return: None,
        }];
        let err = normalize("000001", "Test Fund", &entries).unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
    }

    #[test]
    fn test_bad_date_and_non_numeric_are_malformed() {
        let bad_date = vec![entry("2024/01/02", "1.0")];
        assert!(matches!(
            normalize("000001", "Test Fund", &bad_date),
            Err(AppError::MalformedRecord(_))
        ));

        let bad_nav = vec![entry("2024-01-02", "n/a")];
        assert!(matches!(
            normalize("000001", "Test Fund", &bad_nav),
            Err(AppError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_deserialize_source_fields() {
        let json = r#"{"FSRQ":"2024-01-18","DWJZ":"1.2340","LJJZ":"2.3450","JZZZL":"0.31","SGZT":"开放申购"}"#;
        let raw: RawNavEntry = serde_json::from_str(json).unwrap();
        assert_eq!(raw.trading_day.as_deref(), Some("2024-01-18"));
        assert_eq!(raw.cum_nav.as_deref(), Some("2.3450"));
        assert_eq!(raw.daily_return, None);
    }

    #[test]
    fn test_empty_batch() {
        let records = normalize("000001", "Test Fund", &[]).unwrap();
        assert!(records.is_empty());
    }
}
