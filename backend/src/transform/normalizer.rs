//! Record normalizer: one raw row → one canonical [`Record`].
//!
//! Every field is resolved through the [`FieldMapping`], then cleaned:
//! strings are trimmed or replaced by the sentinel, the date becomes a
//! report month, prices and quantities go through the locale number parser.
//! Nothing here fails; defaults are counted in [`Diagnostics`].

use crate::locale::{self, DateFormat, NumberFormat, ParsedNumber};
use crate::models::{RawRow, Record, SENTINEL};

use super::diagnostics::Diagnostics;
use super::mapping::{Field, FieldMapping};

/// Result of normalizing a batch of rows
#[derive(Debug, Clone, Default)]
pub struct NormalizeResult {
    pub records: Vec<Record>,
    pub diagnostics: Diagnostics,
}

impl NormalizeResult {
    /// Records that can take part in the rollup.
    pub fn usable_count(&self) -> usize {
        self.records.iter().filter(|r| r.group_key1().is_some()).count()
    }
}

/// Normalizes raw rows with one mapping and one pair of format hints.
#[derive(Debug, Clone)]
pub struct Normalizer<'m> {
    mapping: &'m FieldMapping,
    date_format: DateFormat,
    number_format: NumberFormat,
}

impl<'m> Normalizer<'m> {
    pub fn new(mapping: &'m FieldMapping, date_format: DateFormat, number_format: NumberFormat) -> Self {
        Self {
            mapping,
            date_format,
            number_format,
        }
    }

    /// Normalize every row, in order.
    pub fn normalize(&self, rows: &[RawRow]) -> NormalizeResult {
        let mut diagnostics = Diagnostics::new();
        let records: Vec<Record> = rows
            .iter()
            .map(|row| self.normalize_row(row, &mut diagnostics))
            .collect();

        diagnostics.excluded_records = records.iter().filter(|r| r.group_key1().is_none()).count();

        NormalizeResult { records, diagnostics }
    }

    /// Normalize a single row.
    pub fn normalize_row(&self, row: &RawRow, diagnostics: &mut Diagnostics) -> Record {
        diagnostics.rows_seen += 1;

        let month = match self.mapping.resolve(Field::Date, row) {
            Some(cell) if !cell.is_blank() => {
                let parsed = locale::parse_date(cell, self.date_format);
                if parsed.is_none() {
                    diagnostics.unparsable_dates += 1;
                }
                parsed.as_ref().and_then(locale::date::month_of)
            }
            _ => {
                diagnostics.missing_dates += 1;
                None
            }
        };

        Record {
            month,
            hs_code: self.text(Field::HsCode, row, diagnostics),
            item_desc: self.text(Field::ItemDesc, row, diagnostics),
            item: self.text(Field::Item, row, diagnostics),
            gsm: self.text(Field::Gsm, row, diagnostics),
            add_on: self.text(Field::AddOn, row, diagnostics),
            importer: self.text(Field::Importer, row, diagnostics),
            supplier: self.text(Field::Supplier, row, diagnostics),
            origin_country: self.text(Field::OriginCountry, row, diagnostics),
            incoterms: self.text(Field::Incoterms, row, diagnostics),
            unit_price: self.number(Field::UnitPrice, row, diagnostics),
            quantity: self.number(Field::Quantity, row, diagnostics),
        }
    }

    /// Trimmed text, or the sentinel for absent/blank cells.
    fn text(&self, field: Field, row: &RawRow, diagnostics: &mut Diagnostics) -> String {
        match self.mapping.resolve(field, row).and_then(|cell| cell.as_text()) {
            Some(value) => value,
            None => {
                diagnostics.record_sentinel(field);
                SENTINEL.to_string()
            }
        }
    }

    fn number(&self, field: Field, row: &RawRow, diagnostics: &mut Diagnostics) -> f64 {
        let parsed = match self.mapping.resolve(field, row) {
            Some(cell) => locale::try_parse_number(cell, self.number_format),
            None => ParsedNumber::Blank,
        };
        match parsed {
            ParsedNumber::Blank => diagnostics.blank_numbers += 1,
            ParsedNumber::Invalid => diagnostics.unparsable_numbers += 1,
            ParsedNumber::Value(_) => {}
        }
        parsed.value()
    }
}

/// Normalize rows in one call.
pub fn normalize_rows(
    rows: &[RawRow],
    mapping: &FieldMapping,
    date_format: DateFormat,
    number_format: NumberFormat,
) -> NormalizeResult {
    Normalizer::new(mapping, date_format, number_format).normalize(rows)
}
