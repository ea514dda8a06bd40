//! Key-Based Deduplication Utilities
//!
//! Provides the `(fund_code, trading_day)` identity used by the store to keep
//! merges idempotent across retries and overlapping date ranges.

use crate::models::NavRecord;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Composite identity of a NAV row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavKey {
    pub fund_code: String,
    pub trading_day: NaiveDate,
}

impl NavKey {
    pub fn of(record: &NavRecord) -> Self {
        Self {
            fund_code: record.fund_code.clone(),
            trading_day: record.trading_day,
        }
    }
}

/// Set of keys already present in a table
#[derive(Debug, Default)]
pub struct RecordDeduplicator {
    seen_keys: HashSet<NavKey>,
}

impl RecordDeduplicator {
    /// Create a new deduplicator
    pub fn new() -> Self {
        Self {
            seen_keys: HashSet::new(),
        }
    }

    /// Check if record is duplicate; registers its key when it is not
    pub fn is_duplicate(&mut self, record: &NavRecord) -> bool {
        !self.seen_keys.insert(NavKey::of(record))
    }

    /// Check membership without registering
    pub fn contains(&self, record: &NavRecord) -> bool {
        self.seen_keys.contains(&NavKey::of(record))
    }

    /// Return the records of `batch` whose key has not been seen, keeping the
    /// first occurrence of keys repeated inside the batch. All returned keys are
    /// registered.
    pub fn filter_new(&mut self, batch: &[NavRecord]) -> Vec<NavRecord> {
        batch
            .iter()
            .filter(|record| !self.is_duplicate(record))
            .cloned()
            .collect()
    }
}

/// Count duplicate keys in a dataset
pub fn count_duplicates(records: &[NavRecord]) -> usize {
    let mut seen_keys = HashSet::new();
    let mut duplicate_count = 0;

    for record in records {
        if !seen_keys.insert(NavKey::of(record)) {
            duplicate_count += 1;
        }
    }

    duplicate_count
}

/// Get duplicate information for debugging
pub fn get_duplicate_info(records: &[NavRecord]) -> Vec<(NavKey, usize)> {
    let mut key_counts: HashMap<NavKey, usize> = HashMap::new();

    for record in records {
        *key_counts.entry(NavKey::of(record)).or_insert(0) += 1;
    }

    let mut duplicates: Vec<(NavKey, usize)> = key_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicates.sort();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(code: &str, day: &str, cum_nav: f64) -> NavRecord {
        let day = NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap();
        NavRecord::new(code.to_string(), format!("Fund {}", code), day, Some(cum_nav), cum_nav, 0.0)
    }

    #[test]
    fn test_filter_new_against_existing() {
        let existing = vec![
            create_test_record("000001", "2024-01-02", 1.00),
            create_test_record("000001", "2024-01-03", 1.01),
        ];
        let batch = vec![
            create_test_record("000001", "2024-01-03", 9.99), // Already stored
            create_test_record("000001", "2024-01-04", 1.02),
            create_test_record("110022", "2024-01-03", 2.00), // Same day, other fund
        ];

        let mut dedup = RecordDeduplicator::new();
        assert_eq!(dedup.filter_new(&existing).len(), 2);
        let new = dedup.filter_new(&batch);

        assert_eq!(new.len(), 2);
        assert_eq!(new[0].trading_day.to_string(), "2024-01-04");
        assert_eq!(new[1].fund_code, "110022");
        assert!(batch.iter().all(|record| dedup.contains(record)));
    }

    #[test]
    fn test_filter_new_keeps_first_in_batch() {
        let batch = vec![
            create_test_record("000001", "2024-01-02", 1.00), // First
            create_test_record("000001", "2024-01-02", 1.50), // Duplicate
        ];

        let mut dedup = RecordDeduplicator::new();
        let new = dedup.filter_new(&batch);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].cum_nav, 1.00);
    }

    #[test]
    fn test_count_duplicates() {
        let records = vec![
            create_test_record("000001", "2024-01-02", 1.00),
            create_test_record("000001", "2024-01-02", 1.00),
            create_test_record("000001", "2024-01-03", 1.01),
            create_test_record("000001", "2024-01-03", 1.01),
            create_test_record("000001", "2024-01-03", 1.01),
        ];

        assert_eq!(count_duplicates(&records), 3);

        let info = get_duplicate_info(&records);
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].1, 2);
        assert_eq!(info[1].1, 3);
    }
}
