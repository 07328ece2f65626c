//! Domain models for the rekap pipeline.
//!
//! This module contains the data structures that flow between stages:
//!
//! - [`RawCell`] / [`RawRow`] - one tabulated source line, as handed over by a reader
//! - [`Record`] - the canonical, locale-independent shape of one source line
//! - [`Month`] - the 12 fixed report months
//! - [`GroupKey1`] / [`GroupKey2`] - composite keys of the two rollup levels
//! - [`Level1Row`] / [`Level2Row`] - rollup rows
//! - [`Cell`] / [`ReportGrid`] / [`GroupBlockMeta`] - the laid-out sheet

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Marker for absent, blank or unusable string data.
pub const SENTINEL: &str = "-";

/// Number of leading identifying columns in every report row.
pub const ID_COLUMNS: usize = 5;

/// Number of trailing recap columns in every report row.
pub const RECAP_COLUMNS: usize = 3;

/// Fixed width of every report row: 5 id columns, 12 price/qty pairs, 3 recap columns.
pub const TOTAL_COLUMNS: usize = ID_COLUMNS + 12 * 2 + RECAP_COLUMNS;

/// First recap column (AVG PRICE).
pub const RECAP_START_COLUMN: usize = ID_COLUMNS + 12 * 2;

/// Recap column holding TOTAL QTY, and the grand total on every total row.
pub const GRAND_TOTAL_COLUMN: usize = TOTAL_COLUMNS - 1;

// =============================================================================
// Month
// =============================================================================

/// One of the 12 report months, labelled the way the report header prints them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    Mei,
    Jun,
    Jul,
    Agu,
    Sep,
    Okt,
    Nov,
    Des,
}

impl Month {
    /// All months in calendar order.
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::Mei,
        Month::Jun,
        Month::Jul,
        Month::Agu,
        Month::Sep,
        Month::Okt,
        Month::Nov,
        Month::Des,
    ];

    /// Month from its calendar number (1-12).
    pub fn from_number(number: u32) -> Option<Self> {
        number
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
    }

    /// Month from its printed label, case-insensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .find(|m| m.label().eq_ignore_ascii_case(label))
            .copied()
    }

    /// Zero-based position in the year.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Zero-based quarter (0 = Jan-Mar .. 3 = Okt-Des).
    pub fn quarter(self) -> usize {
        self.index() / 3
    }

    /// Short label used in report headers.
    pub fn label(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::Mei => "Mei",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Agu => "Agu",
            Month::Sep => "Sep",
            Month::Okt => "Okt",
            Month::Nov => "Nov",
            Month::Des => "Des",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serde helper writing `Option<Month>` as its label or the sentinel.
mod month_or_sentinel {
    use super::{Month, SENTINEL};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(month: &Option<Month>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(month.map(Month::label).unwrap_or(SENTINEL))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Month>, D::Error> {
        let label = String::deserialize(d)?;
        Ok(Month::from_label(&label))
    }
}

// =============================================================================
// Raw input
// =============================================================================

/// One raw cell value as produced by an input reader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// Missing or null cell.
    Empty,
    /// Text cell (untrimmed).
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Already-structured date value.
    Date(NaiveDateTime),
}

impl RawCell {
    /// Convert a JSON value into a cell. Booleans are kept as text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => RawCell::Empty,
            Value::String(s) => RawCell::Text(s.clone()),
            Value::Number(n) => n.as_f64().map(RawCell::Number).unwrap_or(RawCell::Empty),
            Value::Bool(b) => RawCell::Text(b.to_string()),
            other => RawCell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RawCell::Empty => Value::Null,
            RawCell::Text(s) => Value::String(s.clone()),
            RawCell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            RawCell::Date(d) => Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }

    /// True for null, NaN and whitespace-only cells.
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            RawCell::Number(n) => n.is_nan(),
            RawCell::Date(_) => false,
        }
    }

    /// Trimmed textual form of the cell, or `None` when blank.
    ///
    /// Integral numbers print without a fractional part so that numeric
    /// HS codes read back as `48025690`, not `48025690.0`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => Some(s.trim().to_string()),
            RawCell::Number(n) => Some(format_number(*n)),
            RawCell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        RawCell::Text(s.to_string())
    }
}

impl From<String> for RawCell {
    fn from(s: String) -> Self {
        RawCell::Text(s)
    }
}

impl From<f64> for RawCell {
    fn from(n: f64) -> Self {
        RawCell::Number(n)
    }
}

impl From<NaiveDateTime> for RawCell {
    fn from(d: NaiveDateTime) -> Self {
        RawCell::Date(d)
    }
}

/// One source line: column label → raw cell, in column order.
///
/// Lookups that can match several labels resolve to the leftmost column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, RawCell)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a JSON object. Non-objects give an empty row.
    pub fn from_json(value: &Value) -> Self {
        value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), RawCell::from_json(v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set a column's cell; a repeated label replaces the earlier cell in place.
    pub fn insert(&mut self, column: impl Into<String>, cell: impl Into<RawCell>) {
        let column = column.into();
        let cell = cell.into();
        match self.cells.iter_mut().find(|(k, _)| *k == column) {
            Some((_, existing)) => *existing = cell,
            None => self.cells.push((column, cell)),
        }
    }

    /// Exact-label lookup.
    pub fn get(&self, column: &str) -> Option<&RawCell> {
        self.cells.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    /// Case-insensitive label lookup; the leftmost matching column wins.
    pub fn get_ignore_case(&self, column: &str) -> Option<&RawCell> {
        let wanted = column.to_lowercase();
        self.cells
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v)
    }

    /// JSON object form, keys sorted.
    pub fn to_json(&self) -> Value {
        let obj: serde_json::Map<String, Value> = self
            .cells
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(obj)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(String, RawCell)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, RawCell)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, cell) in iter {
            row.insert(column, cell);
        }
        row
    }
}

// =============================================================================
// Canonical record
// =============================================================================

/// A normalized source line.
///
/// String fields hold a trimmed value or [`SENTINEL`]. `month` is `None`
/// when the date could not be parsed; such records, and records whose
/// `hs_code` is the sentinel, never reach the rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(with = "month_or_sentinel")]
    pub month: Option<Month>,
    pub hs_code: String,
    pub item_desc: String,
    pub item: String,
    pub gsm: String,
    pub add_on: String,
    pub importer: String,
    pub supplier: String,
    pub origin_country: String,
    pub incoterms: String,
    pub unit_price: f64,
    pub quantity: f64,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            month: None,
            hs_code: SENTINEL.to_string(),
            item_desc: SENTINEL.to_string(),
            item: SENTINEL.to_string(),
            gsm: SENTINEL.to_string(),
            add_on: SENTINEL.to_string(),
            importer: SENTINEL.to_string(),
            supplier: SENTINEL.to_string(),
            origin_country: SENTINEL.to_string(),
            incoterms: SENTINEL.to_string(),
            unit_price: 0.0,
            quantity: 0.0,
        }
    }
}

impl Record {
    /// Level-1 key, or `None` when month or HS code is unusable.
    pub fn group_key1(&self) -> Option<GroupKey1> {
        let month = self.month?;
        if is_sentinel(&self.hs_code) {
            return None;
        }
        Some(GroupKey1 {
            month,
            hs_code: self.hs_code.clone(),
            item: grouping_value(&self.item),
            gsm: grouping_value(&self.gsm),
            add_on: grouping_value(&self.add_on),
        })
    }

    /// Level-2 key (month dropped).
    pub fn group_key2(&self) -> GroupKey2 {
        GroupKey2 {
            hs_code: self.hs_code.clone(),
            item: grouping_value(&self.item),
            gsm: grouping_value(&self.gsm),
            add_on: grouping_value(&self.add_on),
        }
    }
}

/// True for the sentinel and for blank strings.
pub fn is_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == SENTINEL
}

/// Absent and literal "-" both group as "-".
fn grouping_value(value: &str) -> String {
    if is_sentinel(value) {
        SENTINEL.to_string()
    } else {
        value.trim().to_string()
    }
}

// =============================================================================
// Rollup keys and rows
// =============================================================================

/// Identifies a Level-1 aggregate: one product key in one month.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey1 {
    pub month: Month,
    pub hs_code: String,
    pub item: String,
    pub gsm: String,
    pub add_on: String,
}

impl GroupKey1 {
    pub fn level2(&self) -> GroupKey2 {
        GroupKey2 {
            hs_code: self.hs_code.clone(),
            item: self.item.clone(),
            gsm: self.gsm.clone(),
            add_on: self.add_on.clone(),
        }
    }
}

/// Identifies a Level-2 aggregate: one product key across all months.
///
/// Field order is the report sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey2 {
    pub hs_code: String,
    pub item: String,
    pub gsm: String,
    pub add_on: String,
}

impl GroupKey2 {
    pub fn new(
        hs_code: impl Into<String>,
        item: impl Into<String>,
        gsm: impl Into<String>,
        add_on: impl Into<String>,
    ) -> Self {
        Self {
            hs_code: hs_code.into(),
            item: item.into(),
            gsm: gsm.into(),
            add_on: add_on.into(),
        }
    }

    pub fn with_month(&self, month: Month) -> GroupKey1 {
        GroupKey1 {
            month,
            hs_code: self.hs_code.clone(),
            item: self.item.clone(),
            gsm: self.gsm.clone(),
            add_on: self.add_on.clone(),
        }
    }
}

/// Per (month, product key) statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level1Row {
    #[serde(flatten)]
    pub key: GroupKey1,
    /// Mean of positive unit prices, 0 when none.
    pub avg_price: f64,
    /// Sum of all quantities, unclamped.
    pub total_qty: f64,
}

/// Per product key statistics across months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level2Row {
    #[serde(flatten)]
    pub key: GroupKey2,
    /// Mean of the positive monthly average prices, 0 when none.
    pub avg_of_summary_price: f64,
    /// Sum of the monthly quantities.
    pub total_of_summary_qty: f64,
}

// =============================================================================
// Report grid
// =============================================================================

/// One laid-out cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn dash() -> Self {
        Cell::Text(SENTINEL.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Row range of one group block inside a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBlockMeta {
    /// Supplier/origin (or importer) label of the block.
    pub label: String,
    /// Index of the block's first header row in the sheet.
    pub start_row: usize,
    pub header_row_count: usize,
    /// Number of distinct product-key rows.
    pub data_row_count: usize,
    pub has_following_group: bool,
}

/// One sheet worth of laid-out rows plus rendering metadata.
///
/// Column layout: 5 id columns, 12 PRICE/QTY month pairs starting at
/// [`ID_COLUMNS`], then AVG PRICE, INCOTERM and TOTAL QTY from
/// [`RECAP_START_COLUMN`]. On `TOTAL QTY PER MO`, `TOTAL ALL ... PER MO` and
/// per-item rows the grand total sits in [`GRAND_TOTAL_COLUMN`] (31), and the
/// recap cells before it hold the row filler; a writer merging the recap
/// range should read the value from column 31. Quarter rows carry no grand
/// total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGrid {
    /// Partition name; the writer derives the final sheet name from it.
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    pub total_columns: usize,
    pub groups: Vec<GroupBlockMeta>,
    /// Row index of the sheet-wide totals header.
    pub totals_row: Option<usize>,
    /// Row index of the "TOTAL PER ITEM" title.
    pub item_table_row: Option<usize>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_columns() {
        assert_eq!(TOTAL_COLUMNS, 32);
        assert_eq!(RECAP_START_COLUMN, 29);
        assert_eq!(GRAND_TOTAL_COLUMN, 31);
    }

    #[test]
    fn test_month_lookup() {
        assert_eq!(Month::from_number(1), Some(Month::Jan));
        assert_eq!(Month::from_number(12), Some(Month::Des));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
        assert_eq!(Month::from_label("agu"), Some(Month::Agu));
        assert_eq!(Month::Okt.quarter(), 3);
        assert_eq!(Month::Mar.quarter(), 0);
    }

    #[test]
    fn test_raw_cell_text() {
        assert_eq!(RawCell::Number(48025690.0).as_text(), Some("48025690".to_string()));
        assert_eq!(RawCell::Number(1.5).as_text(), Some("1.5".to_string()));
        assert_eq!(RawCell::from("  A4  ").as_text(), Some("A4".to_string()));
        assert_eq!(RawCell::from("   ").as_text(), None);
        assert_eq!(RawCell::Number(f64::NAN).as_text(), None);
        assert!(RawCell::Empty.is_blank());
    }

    #[test]
    fn test_raw_row_from_json() {
        let row = RawRow::from_json(&json!({ "HS CODE": "4802", "Net KG Wt": 12.5, "GSM": null }));
        assert_eq!(row.get("HS CODE"), Some(&RawCell::Text("4802".into())));
        assert_eq!(row.get("Net KG Wt"), Some(&RawCell::Number(12.5)));
        assert_eq!(row.get("GSM"), Some(&RawCell::Empty));
        assert_eq!(row.get_ignore_case("hs code"), Some(&RawCell::Text("4802".into())));
        assert_eq!(row.to_json(), json!({ "HS CODE": "4802", "Net KG Wt": 12.5, "GSM": null }));
    }

    #[test]
    fn test_case_insensitive_lookup_uses_column_order() {
        let rows: Vec<RawRow> = (0..50)
            .map(|_| {
                let mut row = RawRow::new();
                row.insert("Hs code", "1111");
                row.insert("hs Code", "2222");
                row
            })
            .collect();
        for row in &rows {
            assert_eq!(row.get_ignore_case("HS CODE"), Some(&RawCell::Text("1111".into())));
        }
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["Hs code", "hs Code"]);
    }

    #[test]
    fn test_repeated_label_replaces_in_place() {
        let row: RawRow = vec![
            ("A".to_string(), RawCell::from("1")),
            ("B".to_string(), RawCell::from("2")),
            ("A".to_string(), RawCell::from("3")),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("A"), Some(&RawCell::Text("3".into())));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_group_key_excludes_sentinels() {
        let record = Record {
            month: Some(Month::Jan),
            hs_code: "4802".into(),
            ..Record::default()
        };
        let key = record.group_key1().unwrap();
        assert_eq!(key.gsm, "-");

        let no_hs = Record { month: Some(Month::Jan), ..Record::default() };
        assert!(no_hs.group_key1().is_none());

        let no_month = Record { hs_code: "4802".into(), ..Record::default() };
        assert!(no_month.group_key1().is_none());
    }

    #[test]
    fn test_blank_and_dash_group_together() {
        let a = Record { month: Some(Month::Feb), hs_code: "1".into(), gsm: "".into(), ..Record::default() };
        let b = Record { month: Some(Month::Feb), hs_code: "1".into(), gsm: "-".into(), ..Record::default() };
        assert_eq!(a.group_key1(), b.group_key1());
    }

    #[test]
    fn test_record_serialization() {
        let record = Record { month: Some(Month::Mei), hs_code: "4802".into(), ..Record::default() };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["month"], "Mei");
        assert_eq!(value["hsCode"], "4802");

        let unparsed = serde_json::to_value(Record::default()).unwrap();
        assert_eq!(unparsed["month"], "-");
    }

    #[test]
    fn test_cell_serialization() {
        let row = vec![Cell::Empty, Cell::Number(2.5), Cell::dash()];
        assert_eq!(serde_json::to_value(&row).unwrap(), json!([null, 2.5, "-"]));
    }
}
