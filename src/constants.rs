//! Storage and Report Constants
//!
//! Defines default tuning values, file names and column layouts shared by the
//! store back-ends and the report writer.
//!
//! ## Persisted Row Format
//!
//! Both back-ends persist the same 6 columns, in this order:
//! `Code, Name, TradingDay, UnitNAV, CumNAV, Return`
//!
//! `Return` is a plain fraction (0.0031 = 0.31%), never a percentage.

/// Number of rows requested per page from the NAV history endpoint
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Calendar days per year, used for linear annualization
pub const DEFAULT_CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

/// Trading days per year, used to scale daily volatility
pub const DEFAULT_TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized risk-free rate for the Sharpe ratio
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.025;

/// Number of funds ingested when bootstrapping an empty store
pub const DEFAULT_FUND_COUNT: usize = 20;

/// Delay before each page request to the remote source (milliseconds)
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// SQLite table holding the return series
pub const RETURN_TABLE: &str = "Return";

/// Default SQLite database file
pub const DEFAULT_DATABASE_FILE: &str = "EMFund.db";

/// Flat-file store inside the data directory
pub const LOCAL_DB_FILE: &str = "local_db.csv";

/// Annual report inside the data directory
pub const YEAR_REPORT_FILE: &str = "year_repo.csv";

/// Monthly report inside the data directory
pub const MONTH_REPORT_FILE: &str = "month_repo.csv";

/// Number of persisted columns
pub const CSV_COLUMNS: usize = 6;

/// Header of the persisted row format
pub const CSV_HEADER: [&str; CSV_COLUMNS] =
    ["Code", "Name", "TradingDay", "UnitNAV", "CumNAV", "Return"];

/// Column indices for the persisted row format (0-indexed)
pub mod csv_column {
    pub const CODE: usize = 0;
    pub const NAME: usize = 1;
    pub const TRADING_DAY: usize = 2;
    pub const UNIT_NAV: usize = 3;
    pub const CUM_NAV: usize = 4;
    pub const RETURN: usize = 5;
}

/// Header of year_repo.csv
pub const ANNUAL_REPORT_HEADER: [&str; 7] = [
    "Code",
    "Name",
    "Year",
    "Return",
    "YearReturn",
    "Sharpe",
    "MaxDrawDown",
];

/// Header of month_repo.csv
pub const MONTHLY_REPORT_HEADER: [&str; 5] = ["Code", "Name", "Year", "Month", "Return"];

/// Period key of the lifetime row in the annual report
pub const LIFETIME_PERIOD: &str = "ALL";

/// Date format used everywhere a trading day is rendered or parsed
pub const DATE_FORMAT: &str = "%Y-%m-%d";
