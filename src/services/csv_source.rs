//! Local CSV source: previously captured rows in the
//! `Code, Name, TradingDay, UnitNAV, CumNAV, Return` layout.

use crate::error::{AppError, Result};
use crate::models::NavRecord;
use crate::services::csv_parser::read_rows;
use crate::services::normalizer::{normalize, RawNavEntry};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Read a local CSV file and normalize it fund by fund
///
/// Rows carrying a `Return` keep it; rows without one get a return derived
/// from the previous cumulative NAV of the same fund in the file. A fund's
/// name is taken from its first row.
pub fn import_csv(path: &Path) -> Result<Vec<NavRecord>> {
    if !path.is_file() {
        return Err(AppError::Io(format!("Import file not found: {}", path.display())));
    }

    let rows = read_rows(path)?;

    let mut funds: BTreeMap<String, (String, Vec<RawNavEntry>)> = BTreeMap::new();
    for row in rows {
        if row.code.is_empty() {
            return Err(AppError::MalformedRecord(format!(
                "{} line {}: missing Code",
                path.display(),
                row.line
            )));
        }

        let (_, entries) = funds
            .entry(row.code.clone())
            .or_insert_with(|| (row.name.clone(), Vec::new()));
        entries.push(RawNavEntry {
            trading_day: row.trading_day,
            unit_nav: row.unit_nav,
            cum_nav: row.cum_nav,
            daily_return: row.daily_return,
        });
    }

    let mut records = Vec::new();
    for (fund_code, (fund_name, entries)) in &funds {
        let normalized = normalize(fund_code, fund_name, entries).map_err(|e| match e {
            AppError::MalformedRecord(msg) => {
                AppError::MalformedRecord(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(fund_code = %fund_code, rows = normalized.len(), "Normalized imported fund");
        records.extend(normalized);
    }

    info!(
        path = %path.display(),
        funds = funds.len(),
        rows = records.len(),
        "Imported local CSV"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_import_groups_by_fund() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("funds.csv");
        fs::write(
            &path,
            "Code,Name,TradingDay,UnitNAV,CumNAV,Return\n\
             000001,Alpha,2024-01-03,1.02,1.02,0.02\n\
             000001,Alpha,2024-01-02,1.00,1.00,0\n\
             110022,Beta,2024-01-02,2.00,2.00,\n\
             110022,Beta,2024-01-03,2.20,2.20,\n",
        )
        .unwrap();

        let records = import_csv(&path).unwrap();
        assert_eq!(records.len(), 4);

        let alpha: Vec<&NavRecord> = records.iter().filter(|r| r.fund_code == "000001").collect();
        assert_eq!(alpha[0].daily_return, 0.02);
        assert_eq!(alpha[0].fund_name, "Alpha");

        // Blank returns are derived from cumulative NAV
        let beta: Vec<&NavRecord> = records.iter().filter(|r| r.fund_code == "110022").collect();
        assert!((beta[0].daily_return - 0.1).abs() < 1e-12);
        assert_eq!(beta[1].daily_return, 0.0);
    }

    #[test]
    fn test_import_missing_file() {
        let dir = tempdir().unwrap();
        let err = import_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_import_malformed_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("funds.csv");
        fs::write(
            &path,
            "Code,Name,TradingDay,CumNAV\n000001,Alpha,2024-01-02,abc\n",
        )
        .unwrap();

        let err = import_csv(&path).unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
        assert!(err.to_string().contains("funds.csv"));
    }
}
