use crate::constants::{csv_column, CSV_HEADER, DATE_FORMAT};
use crate::error::{AppError, Result};
use crate::models::NavRecord;
use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use std::path::Path;

/// One data line of a NAV CSV file, fields kept as text
#[derive(Debug, Clone, Default)]
pub struct RawCsvRow {
    /// 1-based line number in the file (header is line 1)
    pub line: usize,
    pub code: String,
    pub name: String,
    pub trading_day: Option<String>,
    pub unit_nav: Option<String>,
    pub cum_nav: Option<String>,
    pub daily_return: Option<String>,
}

/// Positions of the known columns in a file's header
struct ColumnMap {
    code: usize,
    name: usize,
    trading_day: usize,
    unit_nav: Option<usize>,
    cum_nav: usize,
    daily_return: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                AppError::MalformedRecord(format!(
                    "{}: missing column '{}'",
                    path.display(),
                    name
                ))
            })
        };

        Ok(Self {
            code: require(CSV_HEADER[csv_column::CODE])?,
            name: require(CSV_HEADER[csv_column::NAME])?,
            trading_day: require(CSV_HEADER[csv_column::TRADING_DAY])?,
            unit_nav: find(CSV_HEADER[csv_column::UNIT_NAV]),
            cum_nav: require(CSV_HEADER[csv_column::CUM_NAV])?,
            daily_return: find(CSV_HEADER[csv_column::RETURN]),
        })
    }
}

fn field(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Read every data row of a CSV file with the `Code, Name, TradingDay, UnitNAV, CumNAV, Return` layout
///
/// Columns are located by header name, so extra columns and a different column
/// order are accepted. `UnitNAV` and `Return` may be absent.
pub fn read_rows(path: &Path) -> Result<Vec<RawCsvRow>> {
    let mut reader = Reader::from_path(path)
        .map_err(|e| AppError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers, path)?;

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let line = index + 2;
        let record = result.map_err(|e| {
            AppError::MalformedRecord(format!("{} line {}: {}", path.display(), line, e))
        })?;

        rows.push(RawCsvRow {
            line,
            code: field(&record, Some(columns.code)).unwrap_or_default(),
            name: field(&record, Some(columns.name)).unwrap_or_default(),
            trading_day: field(&record, Some(columns.trading_day)),
            unit_nav: field(&record, columns.unit_nav),
            cum_nav: field(&record, Some(columns.cum_nav)),
            daily_return: field(&record, columns.daily_return),
        });
    }

    Ok(rows)
}

/// Parse a persisted row strictly: every required field must be present and well-formed
pub fn parse_persisted_row(row: &RawCsvRow, path: &Path) -> Result<NavRecord> {
    let context = format!("{} line {}", path.display(), row.line);
    let malformed = |msg: String| AppError::MalformedRecord(format!("{}: {}", context, msg));

    if row.code.is_empty() {
        return Err(malformed("missing Code".to_string()));
    }

    let day = row
        .trading_day
        .as_deref()
        .ok_or_else(|| malformed("missing TradingDay".to_string()))?;
    let trading_day = NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map_err(|_| malformed(format!("invalid TradingDay '{}'", day)))?;

    let parse = |value: &str, column: &str| -> Result<f64> {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| malformed(format!("{} is not numeric: '{}'", column, value)))
    };

    let unit_nav = row
        .unit_nav
        .as_deref()
        .map(|v| parse(v, "UnitNAV"))
        .transpose()?;
    let cum_nav = parse(
        row.cum_nav
            .as_deref()
            .ok_or_else(|| malformed("missing CumNAV".to_string()))?,
        "CumNAV",
    )?;
    let daily_return = parse(
        row.daily_return
            .as_deref()
            .ok_or_else(|| malformed("missing Return".to_string()))?,
        "Return",
    )?;

    Ok(NavRecord::new(
        row.code.clone(),
        row.name.clone(),
        trading_day,
        unit_nav,
        cum_nav,
        daily_return,
    ))
}

/// Write records in the persisted layout, header included
pub fn write_records(path: &Path, records: &[NavRecord]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::Io(format!("Failed to create {}: {}", path.display(), e)))?;

    writer.write_record(CSV_HEADER)?;

    for record in records {
        let trading_day = record.trading_day.format(DATE_FORMAT).to_string();
        let unit_nav = record.unit_nav.map_or(String::new(), |v| v.to_string());
        let cum_nav = record.cum_nav.to_string();
        let daily_return = record.daily_return.to_string();

        writer.write_record([
            record.fund_code.as_str(),
            record.fund_name.as_str(),
            trading_day.as_str(),
            unit_nav.as_str(),
            cum_nav.as_str(),
            daily_return.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let records = vec![
            NavRecord::new("000001".to_string(), "Alpha".to_string(), day, Some(1.234), 2.345, 0.0031),
            NavRecord::new("000002".to_string(), "Beta".to_string(), day, None, 1.0, 0.0),
        ];

        write_records(&path, &records).unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);

        let parsed: Vec<NavRecord> = rows.iter().map(|r| parse_persisted_row(r, &path).unwrap()).collect();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_columns_located_by_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reordered.csv");
        fs::write(
            &path,
            "TradingDay,Code,Extra,Name,CumNAV\n2024-01-02,000001,x,Alpha,1.5\n",
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0].code, "000001");
        assert_eq!(rows[0].cum_nav.as_deref(), Some("1.5"));
        assert_eq!(rows[0].daily_return, None);
        assert_eq!(rows[0].unit_nav, None);
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Code,Name,TradingDay\n000001,Alpha,2024-01-02\n").unwrap();

        assert!(matches!(read_rows(&path), Err(AppError::MalformedRecord(_))));
    }

    #[test]
    fn test_strict_parse_rejects_bad_values() {
        let path = Path::new("local_db.csv");
        let good = RawCsvRow {
            line: 2,
            code: "000001".to_string(),
            name: "Alpha".to_string(),
            trading_day: Some("2024-01-02".to_string()),
            unit_nav: Some("1.0".to_string()),
            cum_nav: Some("1.0".to_string()),
            daily_return: Some("0".to_string()),
        };
        assert!(parse_persisted_row(&good, path).is_ok());

        let bad_date = RawCsvRow { trading_day: Some("02/01/2024".to_string()), ..good.clone() };
        assert!(matches!(parse_persisted_row(&bad_date, path), Err(AppError::MalformedRecord(_))));

        let bad_nav = RawCsvRow { cum_nav: Some("abc".to_string()), ..good.clone() };
        assert!(matches!(parse_persisted_row(&bad_nav, path), Err(AppError::MalformedRecord(_))));

        let no_return = RawCsvRow { daily_return: None, ..good };
        assert!(matches!(parse_persisted_row(&no_return, path), Err(AppError::MalformedRecord(_))));
    }
}
