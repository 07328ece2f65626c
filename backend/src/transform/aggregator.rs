//! Two-level rollup of canonical records.
//!
//! # Architecture
//!
//! ```text
//! Records                          Level-1 (key × month)        Level-2 (key)
//! ┌─────────────────────────┐     ┌──────────────────────┐     ┌───────────────────┐
//! │ Jan A X - -  5.0  10    │     │ Jan A X - -  5.0  15 │     │ A X - -  6.5  35  │
//! │ Jan A X - -  0.0   5    │  →  │ Feb A X - -  8.0  20 │  →  └───────────────────┘
//! │ Feb A X - -  8.0  20    │     └──────────────────────┘
//! └─────────────────────────┘
//! ```
//!
//! Both levels average with [`average_of_positive`], so Level-2 prices are an
//! average of Level-1 averages.

use std::collections::BTreeMap;

use crate::models::{GroupKey1, GroupKey2, Level1Row, Level2Row, Month, Record};

/// Mean of the values strictly greater than 0, or 0 when there are none.
pub fn average_of_positive(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| **v > 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Both rollup tables for one set of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Sorted by (month, hsCode, item, gsm, addOn).
    pub level1: Vec<Level1Row>,
    /// Sorted by (hsCode, item, gsm, addOn).
    pub level2: Vec<Level2Row>,
    /// Records left out for lack of month or HS code.
    pub excluded: usize,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.level2.is_empty()
    }

    /// Level-1 row for a product key in a month.
    pub fn level1_for(&self, key: &GroupKey2, month: Month) -> Option<&Level1Row> {
        let wanted = key.with_month(month);
        self.level1
            .binary_search_by(|row| row.key.cmp(&wanted))
            .ok()
            .map(|i| &self.level1[i])
    }

    pub fn level2_for(&self, key: &GroupKey2) -> Option<&Level2Row> {
        self.level2
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|i| &self.level2[i])
    }

    /// Distinct product keys, in report order.
    pub fn keys(&self) -> impl Iterator<Item = &GroupKey2> {
        self.level2.iter().map(|row| &row.key)
    }
}

/// Per-key accumulator for the Level-1 pass.
#[derive(Default)]
struct Level1Builder {
    prices: Vec<f64>,
    total_qty: f64,
}

impl Level1Builder {
    fn add(&mut self, record: &Record) {
        self.prices.push(record.unit_price);
        self.total_qty += record.quantity;
    }

    fn build(self, key: GroupKey1) -> Level1Row {
        Level1Row {
            key,
            avg_price: average_of_positive(&self.prices),
            total_qty: self.total_qty,
        }
    }
}

/// Aggregate records into both levels.
///
/// Pure: the same records always give the same tables.
pub fn aggregate<'a, I>(records: I) -> Aggregation
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut builders: BTreeMap<GroupKey1, Level1Builder> = BTreeMap::new();
    let mut excluded = 0;

    for record in records {
        match record.group_key1() {
            Some(key) => builders.entry(key).or_default().add(record),
            None => excluded += 1,
        }
    }

    let level1: Vec<Level1Row> = builders
        .into_iter()
        .map(|(key, builder)| builder.build(key))
        .collect();
    let level2 = summarize_level2(&level1);

    Aggregation {
        level1,
        level2,
        excluded,
    }
}

/// Level-2 pass: fold Level-1 rows across months.
pub fn summarize_level2(level1: &[Level1Row]) -> Vec<Level2Row> {
    let mut groups: BTreeMap<GroupKey2, (Vec<f64>, f64)> = BTreeMap::new();

    for row in level1 {
        let (prices, qty) = groups.entry(row.key.level2()).or_default();
        prices.push(row.avg_price);
        *qty += row.total_qty;
    }

    groups
        .into_iter()
        .map(|(key, (prices, qty))| Level2Row {
            key,
            avg_of_summary_price: average_of_positive(&prices),
            total_of_summary_qty: qty,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(month: Month, hs: &str, item: &str, qty: f64, price: f64) -> Record {
        Record {
            month: Some(month),
            hs_code: hs.into(),
            item: item.into(),
            quantity: qty,
            unit_price: price,
            ..Record::default()
        }
    }

    #[test]
    fn test_average_of_positive() {
        assert_eq!(average_of_positive(&[]), 0.0);
        assert_eq!(average_of_positive(&[-1.0, 0.0, 5.0, 15.0]), 10.0);
        assert_eq!(average_of_positive(&[0.0, -3.0]), 0.0);
    }

    #[test]
    fn test_two_level_scenario() {
        let records = vec![
            record(Month::Jan, "A", "X", 10.0, 5.0),
            record(Month::Jan, "A", "X", 5.0, 0.0),
            record(Month::Feb, "A", "X", 20.0, 8.0),
        ];
        let agg = aggregate(&records);

        assert_eq!(agg.level1.len(), 2);
        assert_eq!(agg.level1[0].key.month, Month::Jan);
        assert_eq!(agg.level1[0].key.gsm, "-");
        assert_eq!(agg.level1[0].avg_price, 5.0);
        assert_eq!(agg.level1[0].total_qty, 15.0);
        assert_eq!(agg.level1[1].key.month, Month::Feb);
        assert_eq!(agg.level1[1].avg_price, 8.0);
        assert_eq!(agg.level1[1].total_qty, 20.0);

        assert_eq!(agg.level2.len(), 1);
        assert_eq!(agg.level2[0].key, GroupKey2::new("A", "X", "-", "-"));
        assert_eq!(agg.level2[0].avg_of_summary_price, 6.5);
        assert_eq!(agg.level2[0].total_of_summary_qty, 35.0);
    }

    #[test]
    fn test_sentinel_hs_code_contributes_nothing() {
        let records = vec![
            record(Month::Jan, "A", "X", 10.0, 5.0),
            record(Month::Jan, "-", "X", 99.0, 99.0),
            Record { month: None, hs_code: "A".into(), quantity: 7.0, ..Record::default() },
        ];
        let agg = aggregate(&records);
        assert_eq!(agg.excluded, 2);
        assert_eq!(agg.level1.len(), 1);
        assert_eq!(agg.level1[0].total_qty, 10.0);
        assert!(agg.level2.iter().all(|row| row.key.hs_code != "-"));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = vec![
            record(Month::Mar, "B", "Y", 3.0, 2.0),
            record(Month::Jan, "A", "X", 1.0, 1.0),
            record(Month::Mar, "B", "Y", -1.0, 4.0),
        ];
        assert_eq!(aggregate(&records), aggregate(&records));
    }

    #[test]
    fn test_level2_qty_is_sum_of_level1() {
        let records = vec![
            record(Month::Jan, "A", "X", 10.0, 1.0),
            record(Month::Apr, "A", "X", -4.0, 1.0),
            record(Month::Des, "A", "X", 2.5, 0.0),
            record(Month::Jan, "B", "X", 1.0, 3.0),
        ];
        let agg = aggregate(&records);
        for l2 in &agg.level2 {
            let sum: f64 = agg
                .level1
                .iter()
                .filter(|l1| l1.key.level2() == l2.key)
                .map(|l1| l1.total_qty)
                .sum();
            assert_eq!(l2.total_of_summary_qty, sum);
        }
        assert_eq!(agg.level2_for(&GroupKey2::new("A", "X", "-", "-")).unwrap().total_of_summary_qty, 8.5);
    }

    #[test]
    fn test_lookups() {
        let records = vec![record(Month::Feb, "A", "X", 4.0, 2.0), record(Month::Jan, "B", "Z", 1.0, 1.0)];
        let agg = aggregate(&records);
        let key = GroupKey2::new("A", "X", "-", "-");
        assert_eq!(agg.level1_for(&key, Month::Feb).map(|r| r.total_qty), Some(4.0));
        assert!(agg.level1_for(&key, Month::Jan).is_none());
        let keys: Vec<&str> = agg.keys().map(|k| k.hs_code.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }
}
