//! Error types for the rekap pipeline.
//!
//! Only whole-run failures are errors here. Unparsable cells, blank fields
//! and unusable grouping data are recovered locally with sentinels and show
//! up in [`crate::transform::Diagnostics`] instead.
//!
//! - [`CsvError`] - reading raw rows
//! - [`ProfileError`] - mapping profile registry
//! - [`ReportError`] - top-level run errors
//! - [`OutputError`] - writing finished sheets
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading raw rows.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Content could not be decoded.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Malformed CSV.
    #[error("Invalid CSV format: {0}")]
    ParseError(#[from] csv::Error),

    /// Malformed JSON row dump.
    #[error("Invalid JSON rows: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A JSON input that is not an array of objects.
    #[error("Line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in input")]
    NoHeaders,
}

// =============================================================================
// Profile Errors
// =============================================================================

/// Errors from the mapping profile registry.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile not found.
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// Invalid profile or mapping data.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// IO error.
    #[error("Profile IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Profile JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Report Errors (top-level)
// =============================================================================

/// Top-level run errors.
///
/// This is the error type returned by [`crate::transform::pipeline::build_report`].
#[derive(Debug, Error)]
pub enum ReportError {
    /// Input reading error.
    #[error("Input error: {0}")]
    Csv(#[from] CsvError),

    /// No raw rows at all.
    #[error("No rows to process")]
    EmptyInput,

    /// Rows were read but none survived into the rollup.
    #[error("No usable records: all {rows} rows lack a parsable date or an HS code")]
    NoRecords { rows: usize },

    /// Every partition and group came out empty.
    #[error("No sheet could be produced from {records} records ({excluded} excluded from aggregation)")]
    NoSheets { records: usize, excluded: usize },
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing finished sheets.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Output IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Output CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Result type for report runs.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> ReportError
        let csv_err = CsvError::EmptyFile;
        let report_err: ReportError = csv_err.into();
        assert!(report_err.to_string().contains("empty"));
    }

    #[test]
    fn test_no_sheets_format() {
        let err = ReportError::NoSheets { records: 12, excluded: 12 };
        let msg = err.to_string();
        assert!(msg.contains("12 records"));
        assert!(msg.contains("12 excluded"));
    }

    #[test]
    fn test_invalid_row_format() {
        let err = CsvError::InvalidRow { line: 3, message: "expected an object".into() };
        assert_eq!(err.to_string(), "Line 3: expected an object");
    }
}
