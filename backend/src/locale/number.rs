//! Locale-aware number parsing.
//!
//! Parsing is permissive: anything that is not a recognizable number reads
//! as 0. [`try_parse_number`] keeps the distinction between a blank cell and
//! garbage so callers can count what was defaulted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::RawCell;

/// Number format hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// `1,234.56`
    American,
    /// `1.234,56`
    European,
    #[default]
    Auto,
}

impl NumberFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            NumberFormat::American => "american",
            NumberFormat::European => "european",
            NumberFormat::Auto => "auto",
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumberFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "american" | "us" => Ok(NumberFormat::American),
            "european" | "eu" => Ok(NumberFormat::European),
            "auto" => Ok(NumberFormat::Auto),
            other => Err(format!(
                "unknown number format '{}' (expected auto, american or european)",
                other
            )),
        }
    }
}

static AMERICAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{1,3}(,\d{3})*(\.\d+)?$").expect("valid american number pattern")
});

static EUROPEAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{1,3}(\.\d{3})*(,\d+)?$").expect("valid european number pattern")
});

static PLAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid plain number pattern"));

/// Outcome of parsing one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedNumber {
    Value(f64),
    /// Empty or whitespace-only input.
    Blank,
    /// Non-empty input matching no pattern.
    Invalid,
}

impl ParsedNumber {
    /// Collapse to the permissive value: blank and invalid read as 0.
    pub fn value(self) -> f64 {
        match self {
            ParsedNumber::Value(v) => v,
            ParsedNumber::Blank | ParsedNumber::Invalid => 0.0,
        }
    }
}

/// Parse a raw cell, defaulting to 0.
pub fn parse_number(cell: &RawCell, format: NumberFormat) -> f64 {
    try_parse_number(cell, format).value()
}

/// Parse a string, defaulting to 0.
pub fn parse_number_str(s: &str, format: NumberFormat) -> f64 {
    try_parse_number_str(s, format).value()
}

/// Parse a raw cell, keeping blank and invalid apart.
///
/// Numeric cells pass through unchanged; NaN and infinities are invalid.
pub fn try_parse_number(cell: &RawCell, format: NumberFormat) -> ParsedNumber {
    match cell {
        RawCell::Empty => ParsedNumber::Blank,
        RawCell::Number(n) if n.is_nan() => ParsedNumber::Blank,
        RawCell::Number(n) if n.is_finite() => ParsedNumber::Value(*n),
        RawCell::Number(_) => ParsedNumber::Invalid,
        RawCell::Text(s) => try_parse_number_str(s, format),
        RawCell::Date(_) => ParsedNumber::Invalid,
    }
}

/// Parse a string, keeping blank and invalid apart.
pub fn try_parse_number_str(s: &str, format: NumberFormat) -> ParsedNumber {
    let s = s.trim();
    if s.is_empty() {
        return ParsedNumber::Blank;
    }

    let parsed = match format {
        NumberFormat::American => parse_american(s),
        NumberFormat::European => parse_european(s),
        NumberFormat::Auto => parse_american(s).or_else(|| parse_european(s)),
    }
    .or_else(|| parse_plain(s));

    match parsed {
        Some(v) if v.is_finite() => ParsedNumber::Value(v),
        _ => ParsedNumber::Invalid,
    }
}

fn parse_american(s: &str) -> Option<f64> {
    if !AMERICAN_RE.is_match(s) {
        return None;
    }
    s.replace(',', "").parse().ok()
}

fn parse_european(s: &str) -> Option<f64> {
    if !EUROPEAN_RE.is_match(s) {
        return None;
    }
    s.replace('.', "").replace(',', ".").parse().ok()
}

/// Ungrouped decimal such as `1234.56`.
fn parse_plain(s: &str) -> Option<f64> {
    if !PLAIN_RE.is_match(s) {
        return None;
    }
    s.parse().ok()
}
