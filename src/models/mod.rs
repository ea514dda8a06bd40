mod app_config;
mod nav_record;
mod period_metrics;

pub use app_config::{AppConfig, FetchConfig, IngestStats, MetricsConfig, StoreBackend};
pub use nav_record::NavRecord;
pub use period_metrics::{
    AnnualReportRow, LifetimeMetrics, MonthlyReportRow, PeriodKey, PeriodMetrics,
    ReportGranularity,
};
