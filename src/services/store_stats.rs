use crate::models::NavRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Overall store statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub total_rows: usize,
    pub funds: Vec<FundInfo>,
}

/// Coverage of a single fund
#[derive(Debug, Clone, PartialEq)]
pub struct FundInfo {
    pub fund_code: String,
    pub fund_name: String,
    pub record_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_cum_nav: f64,
}

impl StoreStats {
    pub fn has_data(&self) -> bool {
        self.total_rows > 0
    }
}

/// Summarize store contents per fund, ordered by fund code
pub fn get_store_stats(records: &[NavRecord]) -> StoreStats {
    let mut funds: BTreeMap<&str, FundInfo> = BTreeMap::new();

    for record in records {
        let info = funds
            .entry(record.fund_code.as_str())
            .or_insert_with(|| FundInfo {
                fund_code: record.fund_code.clone(),
                fund_name: record.fund_name.clone(),
                record_count: 0,
                first_date: record.trading_day,
                last_date: record.trading_day,
                last_cum_nav: record.cum_nav,
            });

        info.record_count += 1;
        info.first_date = info.first_date.min(record.trading_day);
        if record.trading_day >= info.last_date {
            info.last_date = record.trading_day;
            info.last_cum_nav = record.cum_nav;
            info.fund_name = record.fund_name.clone();
        }
    }

    StoreStats {
        total_rows: records.len(),
        funds: funds.into_values().collect(),
    }
}
