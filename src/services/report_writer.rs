//! Report and export writers
//!
//! Writes the two performance reports and the per-fund history exports into
//! the data directory. Undefined ratios are written as empty cells.

use crate::constants::{ANNUAL_REPORT_HEADER, MONTHLY_REPORT_HEADER};
use crate::error::{AppError, Result};
use crate::models::{NavRecord, PeriodMetrics, ReportGranularity};
use crate::services::csv_parser::write_records;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Io(format!("Failed to create {}: {}", dir.display(), e)))
}

/// Write one report table to `path`, header included even when empty
pub fn write_report(
    path: &Path,
    granularity: ReportGranularity,
    rows: &[PeriodMetrics],
) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| AppError::Io(format!("Failed to create {}: {}", path.display(), e)))?;

    match granularity {
        ReportGranularity::Annual => {
            writer.write_record(ANNUAL_REPORT_HEADER)?;
            for row in rows {
                writer.serialize(row.to_annual_row())?;
            }
        }
        ReportGranularity::Monthly => {
            writer.write_record(MONTHLY_REPORT_HEADER)?;
            for row in rows {
                writer.serialize(row.to_monthly_row())?;
            }
        }
    }

    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "Wrote {} report", granularity);
    Ok(rows.len())
}

/// Write a report under its standard file name inside `data_dir`
pub fn write_report_file(
    data_dir: &Path,
    granularity: ReportGranularity,
    rows: &[PeriodMetrics],
) -> Result<PathBuf> {
    ensure_dir(data_dir)?;
    let path = data_dir.join(granularity.to_filename());
    write_report(&path, granularity, rows)?;
    Ok(path)
}

/// File name for a fund export; path separators in the name are replaced
pub fn export_file_name(fund_code: &str, fund_name: &str) -> String {
    let name: String = fund_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}_{}.csv", fund_code, name)
}

/// Export one fund's canonical rows to `<data_dir>/<code>_<name>.csv`
pub fn export_fund(
    data_dir: &Path,
    fund_code: &str,
    fund_name: &str,
    records: &[NavRecord],
) -> Result<PathBuf> {
    ensure_dir(data_dir)?;
    let path = data_dir.join(export_file_name(fund_code, fund_name));
    write_records(&path, records)?;
    info!(fund_code = %fund_code, path = %path.display(), rows = records.len(), "Exported fund history");
    Ok(path)
}
