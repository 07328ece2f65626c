//! Data-quality counters collected during a run.
//!
//! Counting never changes output: every value counted here has already been
//! replaced by its sentinel or default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::mapping::Field;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Raw rows handed to the normalizer.
    pub rows_seen: usize,
    /// Rows with no date column or a blank date cell.
    pub missing_dates: usize,
    /// Rows whose date matched no strategy.
    pub unparsable_dates: usize,
    /// Blank price/quantity cells read as 0.
    pub blank_numbers: usize,
    /// Non-blank price/quantity cells that were not numbers, read as 0.
    pub unparsable_numbers: usize,
    /// Sentinel substitutions per string field.
    pub sentinel_fields: BTreeMap<Field, usize>,
    /// Records with no month or HS code, left out of the rollup.
    pub excluded_records: usize,
    /// Group blocks that produced no rows, as "partition / group".
    pub skipped_groups: Vec<String>,
    /// Partitions that produced no sheet.
    pub skipped_partitions: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sentinel(&mut self, field: Field) {
        *self.sentinel_fields.entry(field).or_insert(0) += 1;
    }

    pub fn sentinel_count(&self, field: Field) -> usize {
        self.sentinel_fields.get(&field).copied().unwrap_or(0)
    }

    /// Total number of values replaced by a default.
    pub fn defaulted_values(&self) -> usize {
        self.missing_dates
            + self.unparsable_dates
            + self.blank_numbers
            + self.unparsable_numbers
            + self.sentinel_fields.values().sum::<usize>()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "{} rows, {} excluded, {} unparsable dates, {} unparsable numbers, {} defaulted values, {} skipped groups",
            self.rows_seen,
            self.excluded_records,
            self.unparsable_dates,
            self.unparsable_numbers,
            self.defaulted_values(),
            self.skipped_groups.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_counts() {
        let mut diag = Diagnostics::new();
        diag.record_sentinel(Field::Gsm);
        diag.record_sentinel(Field::Gsm);
        diag.record_sentinel(Field::AddOn);
        assert_eq!(diag.sentinel_count(Field::Gsm), 2);
        assert_eq!(diag.sentinel_count(Field::Item), 0);
        assert_eq!(diag.defaulted_values(), 3);
    }

    #[test]
    fn test_summary() {
        let mut diag = Diagnostics { rows_seen: 5, excluded_records: 1, unparsable_dates: 1, ..Diagnostics::default() };
        diag.record_sentinel(Field::Gsm);
        diag.skipped_groups.push("PT A / Unknown".into());
        assert_eq!(
            diag.summary(),
            "5 rows, 1 excluded, 1 unparsable dates, 0 unparsable numbers, 2 defaulted values, 1 skipped groups"
        );
    }

    #[test]
    fn test_serializes_field_names() {
        let mut diag = Diagnostics::new();
        diag.record_sentinel(Field::OriginCountry);
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["sentinelFields"]["originCountry"], 1);
        assert_eq!(value["rowsSeen"], 0);
    }
}
