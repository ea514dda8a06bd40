mod csv_parser;
pub mod csv_sink;
pub mod csv_source;
pub mod eastmoney;
pub mod fund_sync;
pub mod metrics;
pub mod normalizer;
pub mod report_writer;
pub mod sqlite_sink;
pub mod store_sink;
pub mod store_stats;
pub mod time_series_store;

pub use csv_source::import_csv;
pub use eastmoney::{EastMoneyClient, FundListItem};
pub use fund_sync::{FundSync, NavSource};
pub use metrics::MetricsAggregator;
pub use normalizer::{normalize, RawNavEntry};
pub use report_writer::{export_fund, write_report_file};
pub use store_sink::{open_sink, StoreSink};
pub use store_stats::{get_store_stats, FundInfo, StoreStats};
pub use time_series_store::TimeSeriesStore;
