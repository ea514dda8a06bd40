use crate::constants::{DATE_FORMAT, RETURN_TABLE};
use crate::error::{AppError, Result};
use crate::models::NavRecord;
use crate::services::store_sink::StoreSink;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// SQLite back-end: merged rows are inserted into the "Return" table inside an
/// open transaction, which `flush` commits
pub struct SqliteSink {
    database_path: PathBuf,
    pool: Option<SqlitePool>,
    transaction: Option<Transaction<'static, Sqlite>>,
}

impl SqliteSink {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            pool: None,
            transaction: None,
        }
    }

    /// Open the connection pool on first use and make sure the schema exists
    async fn connect(&mut self) -> Result<&SqlitePool> {
        if self.pool.is_none() {
            info!("Connecting to SQLite database at: {:?}", self.database_path);

            if let Some(parent) = self.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            let connect_options = SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .busy_timeout(Duration::from_secs(30));

            let pool = SqlitePool::connect_with(connect_options).await.map_err(|e| {
                error!("Error connecting to SQLite database {:?}: {}", self.database_path, e);
                AppError::SourceUnavailable(format!(
                    "Failed to connect to {}: {}",
                    self.database_path.display(),
                    e
                ))
            })?;

            initialize_schema(&pool).await?;
            self.pool = Some(pool);
        }

        self.pool
            .as_ref()
            .ok_or_else(|| AppError::Database("connection pool missing".to_string()))
    }
}

/// Create the return table and its key index
async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    let create_table_query = format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{table}" (
            Code TEXT NOT NULL,
            Name TEXT NOT NULL,
            TradingDay TEXT NOT NULL,
            UnitNAV REAL,
            CumNAV REAL NOT NULL,
            "Return" REAL NOT NULL
        )
        "#,
        table = RETURN_TABLE
    );
    sqlx::query(&create_table_query).execute(pool).await?;

    // Unique key backing the merge invariant
    let create_index_query = format!(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_return_code_day ON "{}"(Code, TradingDay)"#,
        RETURN_TABLE
    );
    if let Err(e) = sqlx::query(&create_index_query).execute(pool).await {
        // Tables written by older tools may already hold duplicate keys
        warn!("Could not create unique (Code, TradingDay) index: {}", e);
    }

    debug!("Database schema initialized");
    Ok(())
}

/// Read a numeric column that older writers may have stored as text
fn read_number(row: &SqliteRow, column: &str, context: &str) -> Result<Option<f64>> {
    if let Ok(value) = row.try_get::<Option<f64>, _>(column) {
        return match value {
            Some(v) if !v.is_finite() => Err(AppError::MalformedRecord(format!(
                "{}: {} is not finite",
                context, column
            ))),
            other => Ok(other),
        };
    }

    let text: Option<String> = row.try_get(column).map_err(|e| {
        AppError::MalformedRecord(format!("{}: unreadable {}: {}", context, column, e))
    })?;

    match text.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| {
                AppError::MalformedRecord(format!("{}: {} is not numeric: '{}'", context, column, raw))
            }),
    }
}

fn row_to_record(row: &SqliteRow, index: usize) -> Result<NavRecord> {
    let context = format!("table {} row {}", RETURN_TABLE, index + 1);
    let malformed = |msg: String| AppError::MalformedRecord(format!("{}: {}", context, msg));

    let fund_code: String = row
        .try_get("Code")
        .map_err(|e| malformed(format!("unreadable Code: {}", e)))?;
    let fund_name: String = row
        .try_get("Name")
        .map_err(|e| malformed(format!("unreadable Name: {}", e)))?;
    let day: String = row
        .try_get("TradingDay")
        .map_err(|e| malformed(format!("unreadable TradingDay: {}", e)))?;
    let trading_day = NaiveDate::parse_from_str(day.trim(), DATE_FORMAT)
        .map_err(|_| malformed(format!("invalid TradingDay '{}'", day)))?;

    let unit_nav = read_number(row, "UnitNAV", &context)?;
    let cum_nav = read_number(row, "CumNAV", &context)?
        .ok_or_else(|| malformed("missing CumNAV".to_string()))?;
    let daily_return = read_number(row, "Return", &context)?
        .ok_or_else(|| malformed("missing Return".to_string()))?;

    Ok(NavRecord::new(
        fund_code,
        fund_name,
        trading_day,
        unit_nav,
        cum_nav,
        daily_return,
    ))
}

#[async_trait]
impl StoreSink for SqliteSink {
    async fn load(&mut self) -> Result<Vec<NavRecord>> {
        if !self.database_path.is_file() {
            info!("SQLite database {:?} not found, starting empty", self.database_path);
            return Ok(Vec::new());
        }

        let pool = self.connect().await?;
        let query = format!(
            r#"SELECT Code, Name, TradingDay, UnitNAV, CumNAV, "Return" FROM "{}""#,
            RETURN_TABLE
        );
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let records = rows
            .iter()
            .enumerate()
            .map(|(index, row)| row_to_record(row, index))
            .collect::<Result<Vec<_>>>()?;

        info!("Loaded {} rows from SQLite database", records.len());
        Ok(records)
    }

    async fn append(&mut self, records: &[NavRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if self.transaction.is_none() {
            let transaction = self.connect().await?.begin().await?;
            self.transaction = Some(transaction);
        }
        let transaction = self
            .transaction
            .as_mut()
            .ok_or_else(|| AppError::Database("transaction missing".to_string()))?;

        let insert_query = format!(
            r#"INSERT INTO "{}" (Code, Name, TradingDay, UnitNAV, CumNAV, "Return") VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            RETURN_TABLE
        );

        for record in records {
            sqlx::query(&insert_query)
                .bind(&record.fund_code)
                .bind(&record.fund_name)
                .bind(record.trading_day.format(DATE_FORMAT).to_string())
                .bind(record.unit_nav)
                .bind(record.cum_nav)
                .bind(record.daily_return)
                .execute(&mut **transaction)
                .await?;
        }

        debug!("Appended {} rows to pending transaction", records.len());
        Ok(())
    }

    async fn flush(&mut self, _all_records: &[NavRecord]) -> Result<()> {
        match self.transaction.take() {
            Some(transaction) => {
                transaction.commit().await?;
                info!("Committed pending rows to SQLite database");
            }
            None => debug!("No pending SQLite transaction to commit"),
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            warn!("Closing SQLite sink with uncommitted rows, rolling back");
            if let Err(e) = transaction.rollback().await {
                warn!("Rollback failed: {}", e);
            }
        }
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("SQLite database connection pool closed");
        }
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }

    fn location(&self) -> &Path {
        &self.database_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(code: &str, day: u32, cum_nav: f64, daily_return: f64) -> NavRecord {
        NavRecord::new(
            code.to_string(),
            format!("Fund {}", code),
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            None,
            cum_nav,
            daily_return,
        )
    }

    #[tokio::test]
    async fn test_missing_database_loads_empty() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("EMFund.db");

        let mut sink = SqliteSink::new(db_path.clone());
        assert!(sink.load().await.unwrap().is_empty());
        // Loading must not create the file
        assert!(!db_path.exists());
    }

    #[tokio::test]
    async fn test_append_commit_reload() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("EMFund.db");
        let records = vec![record("000001", 2, 1.0, 0.0), record("000001", 3, 1.02, 0.02)];

        let mut sink = SqliteSink::new(db_path.clone());
        sink.append(&records).await.unwrap();
        sink.flush(&records).await.unwrap();
        sink.close().await;

        let mut reopened = SqliteSink::new(db_path);
        let mut loaded = reopened.load().await.unwrap();
        loaded.sort_by_key(|r| r.trading_day);
        assert_eq!(loaded, records);
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_uncommitted_rows_are_discarded() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("EMFund.db");

        let mut sink = SqliteSink::new(db_path.clone());
        sink.append(&[record("000001", 2, 1.0, 0.0)]).await.unwrap();
        sink.close().await;

        let mut reopened = SqliteSink::new(db_path);
        assert!(reopened.load().await.unwrap().is_empty());
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_legacy_text_columns() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("EMFund.db");

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new().filename(&db_path).create_if_missing(true),
        )
        .await
        .unwrap();
        sqlx::query(
            r#"CREATE TABLE "Return" (Code TEXT, Name TEXT, TradingDay TEXT, UnitNAV TEXT, CumNAV REAL, "Return" REAL)"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(r#"INSERT INTO "Return" VALUES ('000001', 'Alpha', '2024-01-02', '1.2340', 2.345, 0.0)"#)
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let mut sink = SqliteSink::new(db_path);
        let loaded = sink.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].unit_nav, Some(1.234));
        assert_eq!(loaded[0].cum_nav, 2.345);
        sink.close().await;
    }

    #[tokio::test]
    async fn test_malformed_row_is_fatal() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("EMFund.db");

        let mut sink = SqliteSink::new(db_path.clone());
        sink.append(&[record("000001", 2, 1.0, 0.0)]).await.unwrap();
        sink.flush(&[]).await.unwrap();
        let pool = sink.connect().await.unwrap().clone();
        sqlx::query(r#"INSERT INTO "Return" VALUES ('000001', 'Alpha', 'yesterday', NULL, 1.0, 0.0)"#)
            .execute(&pool)
            .await
            .unwrap();

        let err = sink.load().await.unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
        sink.close().await;
    }
}
