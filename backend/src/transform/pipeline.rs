//! High-level pipeline API: raw rows to finished report sheets.
//!
//! This module combines all steps: reading, normalization, partitioning,
//! aggregation and layout.
//!
//! # Example
//!
//! ```rust,ignore
//! use rekap::transform::pipeline::{report_file, ReportOptions};
//! use rekap::transform::FieldMapping;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = report_file(
//!         Path::new("impor-2024.csv"),
//!         &FieldMapping::default(),
//!         &ReportOptions::default(),
//!     )?;
//!
//!     println!("Built {} sheets", result.sheets.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ReportError, ReportResult};
use crate::locale::{DateFormat, NumberFormat};
use crate::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::models::{is_sentinel, RawRow, Record, ReportGrid};
use crate::parser::{parse_file_auto, InputFormat, ParseResult};
use crate::report::{build_group_block, IncotermMode, SheetBuilder};

use super::aggregator::aggregate;
use super::diagnostics::Diagnostics;
use super::mapping::{Field, FieldMapping};
use super::normalizer::Normalizer;

/// Default name of the sheet holding records without an importer.
pub const BLANK_PARTITION_NAME: &str = "Data_Tanpa_Importer";

/// Group label for records with no usable supplier, origin or importer.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Which dimension becomes the sheet and which the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionMode {
    /// One sheet per importer, one block per supplier/origin.
    #[default]
    Importer,
    /// One sheet per supplier/origin, one block per importer.
    Supplier,
}

impl PartitionMode {
    /// Header of the first id column and name used in sheet totals.
    pub fn group_dimension(self) -> &'static str {
        match self {
            PartitionMode::Importer => "SUPPLIER",
            PartitionMode::Supplier => "IMPORTER",
        }
    }
}

impl fmt::Display for PartitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionMode::Importer => f.write_str("importer"),
            PartitionMode::Supplier => f.write_str("supplier"),
        }
    }
}

impl FromStr for PartitionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "importer" => Ok(PartitionMode::Importer),
            "supplier" => Ok(PartitionMode::Supplier),
            other => Err(format!("unknown partition '{}' (expected importer or supplier)", other)),
        }
    }
}

/// Options for one report run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportOptions {
    pub date_format: DateFormat,
    pub number_format: NumberFormat,
    pub incoterm: IncotermMode,
    pub partition_by: PartitionMode,
    /// Sheet name for records without a usable importer.
    pub blank_partition_name: String,
    /// Report period (e.g. "2024"), carried into the output.
    pub period: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            date_format: DateFormat::Auto,
            number_format: NumberFormat::Auto,
            incoterm: IncotermMode::default(),
            partition_by: PartitionMode::Importer,
            blank_partition_name: BLANK_PARTITION_NAME.to_string(),
            period: None,
        }
    }
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfo {
    pub format: InputFormat,
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    /// Header each field reads from; unresolved fields are absent.
    pub resolved_columns: BTreeMap<Field, String>,
}

impl InputInfo {
    pub fn new(parsed: &ParseResult, mapping: &FieldMapping) -> Self {
        Self {
            format: parsed.format,
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.rows.len(),
            resolved_columns: mapping.resolve_headers(&parsed.headers),
        }
    }

    /// Fields no header resolves to; their values default to the sentinel or 0.
    pub fn unresolved_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.resolved_columns.contains_key(f))
            .collect()
    }
}

/// Result of a complete report run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// Sheets in emission order.
    pub sheets: Vec<ReportGrid>,
    pub diagnostics: Diagnostics,
    /// Number of normalized records.
    pub record_count: usize,
    /// Present when the run started from a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputInfo>,
}

/// One sheet's worth of records.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    pub name: String,
    pub records: Vec<&'a Record>,
}

/// Read a file and build its report.
pub fn report_file(
    path: &Path,
    mapping: &FieldMapping,
    options: &ReportOptions,
) -> ReportResult<PipelineResult> {
    log_info(format!("📖 Reading {}...", path.display()));
    let parsed = parse_file_auto(path)?;
    if parsed.format == InputFormat::Csv {
        log_success(format!("Detected encoding: {}", parsed.encoding));
        log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    }
    log_success(format!("Read {} rows", parsed.rows.len()));

    let info = InputInfo::new(&parsed, mapping);
    for (field, column) in &info.resolved_columns {
        log_info_indent(format!("{} ← {}", field, column), 1);
    }
    let missing = info.unresolved_fields();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
        log_warning(format!("No column found for: {}", names.join(", ")));
    }
    let mut result = build_report(&parsed.rows, mapping, options)?;
    result.input = Some(info);
    Ok(result)
}

/// Build all report sheets from raw rows.
///
/// Fails only when there are no rows, no usable records or no sheet at all.
pub fn build_report(
    rows: &[RawRow],
    mapping: &FieldMapping,
    options: &ReportOptions,
) -> ReportResult<PipelineResult> {
    if rows.is_empty() {
        return Err(ReportError::EmptyInput);
    }

    log_info(format!(
        "⚙️  Normalizing {} rows (date: {}, number: {})...",
        rows.len(),
        options.date_format,
        options.number_format
    ));
    let normalized = Normalizer::new(mapping, options.date_format, options.number_format).normalize(rows);
    let mut diagnostics = normalized.diagnostics;
    let records = normalized.records;

    if diagnostics.excluded_records > 0 {
        log_warning(format!(
            "{} records without month or HS code left out of the rollup",
            diagnostics.excluded_records
        ));
    }
    if diagnostics.unparsable_dates > 0 || diagnostics.unparsable_numbers > 0 {
        log_warning(format!(
            "{} unparsable dates, {} unparsable numbers read as 0",
            diagnostics.unparsable_dates, diagnostics.unparsable_numbers
        ));
    }
    if diagnostics.excluded_records == records.len() {
        return Err(ReportError::NoRecords { rows: rows.len() });
    }
    log_success(format!("{} records normalized", records.len()));

    let sheets = build_sheets(&records, options, &mut diagnostics);
    if sheets.is_empty() {
        return Err(ReportError::NoSheets {
            records: records.len(),
            excluded: diagnostics.excluded_records,
        });
    }

    log_success(format!("📦 {} sheets built", sheets.len()));
    Ok(PipelineResult {
        sheets,
        diagnostics,
        record_count: records.len(),
        input: None,
    })
}

/// Partition records and lay out one sheet per partition.
///
/// Partitions and groups that produce nothing are recorded in `diagnostics`.
pub fn build_sheets(
    records: &[Record],
    options: &ReportOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<ReportGrid> {
    let partitions = partition(records, options.partition_by, &options.blank_partition_name);
    log_info(format!(
        "🔄 {} partitions by {}",
        partitions.len(),
        options.partition_by
    ));

    let mut sheets = Vec::new();
    for part in &partitions {
        log_info_indent(format!("{} ({} records)", part.name, part.records.len()), 1);
        match build_sheet(&part.name, &part.records, options, diagnostics) {
            Some(grid) => sheets.push(grid),
            None => {
                log_warning_indent(format!("No data for sheet '{}', skipped", part.name), 1);
                diagnostics.skipped_partitions.push(part.name.clone());
            }
        }
    }
    sheets
}

/// Lay out one sheet: one block per group, then the recap sections.
pub fn build_sheet(
    name: &str,
    records: &[&Record],
    options: &ReportOptions,
    diagnostics: &mut Diagnostics,
) -> Option<ReportGrid> {
    let dimension = options.partition_by.group_dimension();
    let mut sheet = SheetBuilder::new(name, dimension);

    for (group, members) in group_records(records, options.partition_by) {
        let aggregation = aggregate(members.iter().copied());
        let block = build_group_block(&group, dimension, &aggregation, &members, &options.incoterm);
        let rows = block.data_row_count;

        if sheet.push_block(block, &aggregation.level1) {
            log_info_indent(format!("{}: {} product rows", group, rows), 2);
        } else {
            log_warning_indent(format!("No Level-2 rows for group '{}', skipped", group), 2);
            diagnostics.skipped_groups.push(format!("{} / {}", name, group));
        }
    }

    sheet.finish()
}

/// Split records into sheets.
///
/// By importer: records without a usable importer come first under
/// `blank_name`, then one partition per importer in ascending order.
/// By supplier: one partition per supplier/origin/"Unknown", ascending.
pub fn partition<'a>(records: &'a [Record], mode: PartitionMode, blank_name: &str) -> Vec<Partition<'a>> {
    match mode {
        PartitionMode::Importer => {
            let mut blank = Vec::new();
            let mut by_importer: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
            for record in records {
                match usable(&record.importer) {
                    Some(importer) => by_importer.entry(importer.to_string()).or_default().push(record),
                    None => blank.push(record),
                }
            }

            let mut partitions = Vec::new();
            if !blank.is_empty() {
                partitions.push(Partition {
                    name: blank_name.to_string(),
                    records: blank,
                });
            }
            partitions.extend(
                by_importer
                    .into_iter()
                    .map(|(name, records)| Partition { name, records }),
            );
            partitions
        }
        PartitionMode::Supplier => {
            let mut by_supplier: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
            for record in records {
                by_supplier.entry(supplier_label(record)).or_default().push(record);
            }
            by_supplier
                .into_iter()
                .map(|(name, records)| Partition { name, records })
                .collect()
        }
    }
}

/// Group a partition's records into blocks, ordered by group label.
pub fn group_records<'a>(records: &[&'a Record], mode: PartitionMode) -> BTreeMap<String, Vec<&'a Record>> {
    let mut groups: BTreeMap<String, Vec<&'a Record>> = BTreeMap::new();
    for record in records {
        let label = match mode {
            PartitionMode::Importer => supplier_label(record),
            PartitionMode::Supplier => usable(&record.importer)
                .unwrap_or(UNKNOWN_GROUP)
                .to_string(),
        };
        groups.entry(label).or_default().push(*record);
    }
    groups
}

/// Supplier, else origin country, else "Unknown".
pub fn supplier_label(record: &Record) -> String {
    usable(&record.supplier)
        .or_else(|| usable(&record.origin_country))
        .unwrap_or(UNKNOWN_GROUP)
        .to_string()
}

/// A trimmed value that is neither blank, "-" nor "N/A".
fn usable(value: &str) -> Option<&str> {
    let v = value.trim();
    if is_sentinel(v) || v.eq_ignore_ascii_case("N/A") {
        None
    } else {
        Some(v)
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, Month, RawCell, TOTAL_COLUMNS};
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<RawRow> {
        value.as_array().unwrap().iter().map(RawRow::from_json).collect()
    }

    fn record(importer: &str, supplier: &str, origin: &str) -> Record {
        Record {
            month: Some(Month::Jan),
            hs_code: "4802".into(),
            importer: importer.into(),
            supplier: supplier.into(),
            origin_country: origin.into(),
            quantity: 1.0,
            ..Record::default()
        }
    }

    #[test]
    fn test_default_options() {
        let opts = ReportOptions::default();
        assert_eq!(opts.date_format, DateFormat::Auto);
        assert_eq!(opts.number_format, NumberFormat::Auto);
        assert_eq!(opts.incoterm, IncotermMode::Manual("FOB".into()));
        assert_eq!(opts.blank_partition_name, "Data_Tanpa_Importer");
    }

    #[test]
    fn test_options_from_json() {
        let opts: ReportOptions = serde_json::from_value(json!({
            "dateFormat": "DD/MM/YYYY",
            "numberFormat": "european",
            "incoterm": { "mode": "from_column" },
            "partitionBy": "supplier"
        }))
        .unwrap();
        assert_eq!(opts.date_format, DateFormat::DayMonthYear);
        assert_eq!(opts.number_format, NumberFormat::European);
        assert_eq!(opts.incoterm, IncotermMode::FromColumn);
        assert_eq!(opts.partition_by, PartitionMode::Supplier);
        assert_eq!(opts.blank_partition_name, BLANK_PARTITION_NAME);
    }

    #[test]
    fn test_partition_by_importer() {
        let records = vec![
            record("PT B", "S1", "-"),
            record("-", "S1", "-"),
            record("PT A", "S2", "-"),
            record("N/A", "S1", "-"),
            record("PT B", "S3", "-"),
        ];
        let parts = partition(&records, PartitionMode::Importer, BLANK_PARTITION_NAME);
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Data_Tanpa_Importer", "PT A", "PT B"]);
        assert_eq!(parts[0].records.len(), 2);
        assert_eq!(parts[2].records.len(), 2);
    }

    #[test]
    fn test_partition_by_supplier() {
        let records = vec![record("PT A", "-", "China"), record("PT B", "APP", "-"), record("-", "-", "-")];
        let parts = partition(&records, PartitionMode::Supplier, BLANK_PARTITION_NAME);
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["APP", "China", "Unknown"]);
    }

    #[test]
    fn test_group_fallbacks() {
        let records = vec![record("PT A", "APP", "China"), record("PT A", "-", "Korea"), record("PT A", "", "-")];
        let refs: Vec<&Record> = records.iter().collect();
        let groups = group_records(&refs, PartitionMode::Importer);
        let labels: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["APP", "Korea", "Unknown"]);

        let by_importer = group_records(&refs, PartitionMode::Supplier);
        assert_eq!(by_importer.keys().collect::<Vec<_>>(), vec!["PT A"]);
    }

    #[test]
    fn test_build_report_end_to_end() {
        let input = rows(json!([
            { "DATE": "05/01/2024", "HS CODE": "A", "ITEM": "X", "IMPORTER": "PT Kertas", "SUPPLIER": "APP", "qty": "10", "UNIT PRICE(USD)": "5" },
            { "DATE": "20/01/2024", "HS CODE": "A", "ITEM": "X", "IMPORTER": "PT Kertas", "SUPPLIER": "APP", "qty": "5", "UNIT PRICE(USD)": "0" },
            { "DATE": "02/02/2024", "HS CODE": "A", "ITEM": "X", "IMPORTER": "PT Kertas", "SUPPLIER": "APP", "qty": "20", "UNIT PRICE(USD)": "8" },
            { "DATE": "02/02/2024", "HS CODE": "-", "ITEM": "X", "IMPORTER": "PT Kertas", "SUPPLIER": "APP", "qty": "999", "UNIT PRICE(USD)": "1" }
        ]));
        let result = build_report(&input, &FieldMapping::default(), &ReportOptions::default()).unwrap();

        assert_eq!(result.record_count, 4);
        assert_eq!(result.diagnostics.excluded_records, 1);
        assert_eq!(result.sheets.len(), 1);

        let sheet = &result.sheets[0];
        assert_eq!(sheet.name, "PT Kertas");
        assert_eq!(sheet.total_columns, TOTAL_COLUMNS);
        assert_eq!(sheet.groups.len(), 1);
        assert_eq!(sheet.groups[0].data_row_count, 1);

        let data = &sheet.rows[2];
        assert_eq!(data[0], Cell::text("APP"));
        assert_eq!(data[5], Cell::Number(5.0));
        assert_eq!(data[6], Cell::Number(15.0));
        assert_eq!(data[7], Cell::Number(8.0));
        assert_eq!(data[8], Cell::Number(20.0));
        assert_eq!(data[29], Cell::Number(6.5));
        assert_eq!(data[30], Cell::text("FOB"));
        assert_eq!(data[31], Cell::Number(35.0));

        // The HS "-" record shows up nowhere.
        let totals_row = sheet.totals_row.unwrap();
        assert_eq!(sheet.rows[totals_row + 1][31], Cell::Number(35.0));
        assert!(sheet.rows.iter().flatten().all(|c| c.as_number() != Some(999.0)));
    }

    #[test]
    fn test_empty_input() {
        let err = build_report(&[], &FieldMapping::default(), &ReportOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::EmptyInput));
    }

    #[test]
    fn test_no_usable_records() {
        let mut row = RawRow::new();
        row.insert("DATE", RawCell::from("garbage"));
        row.insert("HS CODE", "4802");
        let err = build_report(&[row], &FieldMapping::default(), &ReportOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::NoRecords { rows: 1 }));
    }

    #[test]
    fn test_empty_partition_is_skipped() {
        let records = vec![
            record("PT A", "APP", "-"),
            Record { month: None, ..record("PT B", "APP", "-") },
        ];
        let mut diagnostics = Diagnostics::new();
        let sheets = build_sheets(&records, &ReportOptions::default(), &mut diagnostics);
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "PT A");
        assert_eq!(diagnostics.skipped_partitions, vec!["PT B".to_string()]);
        assert_eq!(diagnostics.skipped_groups, vec!["PT B / APP".to_string()]);
    }

    #[test]
    fn test_supplier_mode_sheet() {
        let records = vec![record("PT A", "APP", "-"), record("-", "APP", "-")];
        let opts = ReportOptions { partition_by: PartitionMode::Supplier, ..ReportOptions::default() };
        let mut diagnostics = Diagnostics::new();
        let sheets = build_sheets(&records, &opts, &mut diagnostics);

        assert_eq!(sheets.len(), 1);
        let sheet = &sheets[0];
        assert_eq!(sheet.name, "APP");
        assert_eq!(sheet.rows[0][0], Cell::text("IMPORTER"));
        let labels: Vec<&str> = sheet.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["PT A", "Unknown"]);
        let totals_row = sheet.totals_row.unwrap();
        assert_eq!(sheet.rows[totals_row + 1][0], Cell::text("TOTAL ALL IMPORTER PER MO"));
    }

    #[test]
    fn test_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("impor.csv");
        std::fs::write(
            &path,
            "DATE;HS CODE;ITEM;IMPORTER;SUPPLIER;qty\n15/03/2024;4802;HVS;PT A;APP;1.000\n",
        )
        .unwrap();

        let opts = ReportOptions { number_format: NumberFormat::European, ..ReportOptions::default() };
        let result = report_file(&path, &FieldMapping::default(), &opts).unwrap();
        let input = result.input.as_ref().unwrap();
        assert_eq!(input.delimiter, ';');
        assert_eq!(input.row_count, 1);
        assert_eq!(input.resolved_columns.get(&Field::Quantity).map(String::as_str), Some("qty"));
        assert_eq!(input.resolved_columns.get(&Field::HsCode).map(String::as_str), Some("HS CODE"));
        assert!(input.unresolved_fields().contains(&Field::UnitPrice));
        assert!(!input.unresolved_fields().contains(&Field::Date));
        assert_eq!(result.sheets[0].rows[2][10], Cell::Number(1000.0));
    }
}
