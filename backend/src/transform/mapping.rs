//! Field mapping: canonical fields to source column labels.
//!
//! A mapping names at most one column per field. Every field also carries an
//! ordered list of fallback labels, so exports from a new source system are
//! usually handled by data (a mapping file) rather than code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{RawCell, RawRow};

/// Canonical record fields a column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Date,
    #[serde(alias = "hs_code")]
    HsCode,
    #[serde(alias = "item_desc", alias = "item_description")]
    ItemDesc,
    Gsm,
    Item,
    #[serde(alias = "add_on")]
    AddOn,
    Importer,
    Supplier,
    #[serde(alias = "origin_country")]
    OriginCountry,
    #[serde(alias = "incoterm")]
    Incoterms,
    #[serde(alias = "unit_price")]
    UnitPrice,
    Quantity,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Date,
        Field::HsCode,
        Field::ItemDesc,
        Field::Gsm,
        Field::Item,
        Field::AddOn,
        Field::Importer,
        Field::Supplier,
        Field::OriginCountry,
        Field::Incoterms,
        Field::UnitPrice,
        Field::Quantity,
    ];

    /// Name used in mapping files.
    pub fn name(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::HsCode => "hsCode",
            Field::ItemDesc => "itemDesc",
            Field::Gsm => "gsm",
            Field::Item => "item",
            Field::AddOn => "addOn",
            Field::Importer => "importer",
            Field::Supplier => "supplier",
            Field::OriginCountry => "originCountry",
            Field::Incoterms => "incoterms",
            Field::UnitPrice => "unitPrice",
            Field::Quantity => "quantity",
        }
    }

    /// Field from its mapping-file name; underscores and case are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_lowercase();
        match wanted.as_str() {
            "itemdescription" => return Some(Field::ItemDesc),
            "incoterm" => return Some(Field::Incoterms),
            _ => {}
        }
        Self::ALL
            .iter()
            .find(|f| f.name().to_lowercase() == wanted)
            .copied()
    }

    /// Built-in fallback column labels, tried in order.
    pub fn default_fallbacks(self) -> &'static [&'static str] {
        match self {
            Field::Date => &["Arrival Date", "DATE", "CUSTOMS CLEARANCE DATE"],
            Field::HsCode => &["HS Code", "HS CODE"],
            Field::ItemDesc => &["Product Description", "ITEM DESC", "PRODUCT DESCRIPTION(EN)"],
            Field::Gsm => &["GSM"],
            Field::Item => &["ITEM"],
            Field::AddOn => &["ADD ON"],
            Field::Importer => &["Consignee Name", "IMPORTER", "PURCHASER"],
            Field::Supplier => &["Shipper Name", "SUPPLIER"],
            Field::OriginCountry => &["Country of Origin", "ORIGIN COUNTRY"],
            Field::Incoterms => &["INCOTERMS", "Incoterms", "INCOTERM", "Incoterm"],
            Field::UnitPrice => &[
                "Standard Unit Rate $",
                "Value CIF US$",
                "CIF KG Unit In USD",
                "USD Qty Unit",
                "UNIT PRICE(USD)",
            ],
            Field::Quantity => &[
                "Standard Qty",
                "Std. Quantity",
                "Net KG Wt",
                "qty",
                "BUSINESS QUANTITY (KG)",
            ],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown field '{}'", s))
    }
}

/// One way of finding a field's cell in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnResolver {
    Exact(String),
    CaseInsensitive(String),
}

impl ColumnResolver {
    pub fn resolve<'r>(&self, row: &'r RawRow) -> Option<&'r RawCell> {
        match self {
            ColumnResolver::Exact(label) => row.get(label),
            ColumnResolver::CaseInsensitive(label) => row.get_ignore_case(label),
        }
    }

    /// Whether a header set contains this resolver's column.
    pub fn matches_header(&self, header: &str) -> bool {
        match self {
            ColumnResolver::Exact(label) => label == header,
            ColumnResolver::CaseInsensitive(label) => label.eq_ignore_ascii_case(header),
        }
    }
}

/// Field → column mapping plus per-field fallback overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Explicitly mapped column per field.
    #[serde(default)]
    pub columns: BTreeMap<Field, String>,

    /// Fallback labels replacing the built-in list for a field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fallbacks: BTreeMap<Field, Vec<String>>,
}

impl FieldMapping {
    /// Mapping with no explicit columns; every field uses its fallbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mapping from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Builder: map a field to a column.
    pub fn with_column(mut self, field: Field, column: impl Into<String>) -> Self {
        self.columns.insert(field, column.into());
        self
    }

    /// Builder: replace a field's fallback list.
    pub fn with_fallbacks<S: Into<String>>(
        mut self,
        field: Field,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        self.fallbacks
            .insert(field, labels.into_iter().map(Into::into).collect());
        self
    }

    /// Fallback labels in effect for a field.
    pub fn fallback_labels(&self, field: Field) -> Vec<String> {
        match self.fallbacks.get(&field) {
            Some(labels) => labels.clone(),
            None => field
                .default_fallbacks()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Ordered resolvers for a field: the mapped column (exact), then each
    /// fallback label exact and case-insensitive.
    pub fn resolvers(&self, field: Field) -> Vec<ColumnResolver> {
        let mut resolvers = Vec::new();
        if let Some(column) = self.columns.get(&field).filter(|c| !c.trim().is_empty()) {
            resolvers.push(ColumnResolver::Exact(column.clone()));
        }
        for label in self.fallback_labels(field) {
            resolvers.push(ColumnResolver::Exact(label.clone()));
            resolvers.push(ColumnResolver::CaseInsensitive(label));
        }
        resolvers
    }

    /// Find a field's cell; the first column present in the row wins,
    /// even when that cell is blank.
    pub fn resolve<'r>(&self, field: Field, row: &'r RawRow) -> Option<&'r RawCell> {
        self.resolvers(field).iter().find_map(|r| r.resolve(row))
    }

    /// Which header each field would read from, for previews and profile matching.
    pub fn resolve_headers(&self, headers: &[String]) -> BTreeMap<Field, String> {
        let mut resolved = BTreeMap::new();
        for field in Field::ALL {
            let hit = self.resolvers(field).iter().find_map(|r| {
                headers.iter().find(|h| r.matches_header(h)).cloned()
            });
            if let Some(header) = hit {
                resolved.insert(field, header);
            }
        }
        resolved
    }

    /// Source columns explicitly named by this mapping.
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.columns.values().cloned().collect();
        columns.sort();
        columns.dedup();
        columns
    }
}
