//! # Rekap - customs import recap engine
//!
//! Rekap turns raw customs-import exports (CEISA extracts, broker
//! spreadsheets) into monthly price/quantity recap sheets per importer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / JSON  │────▶│   Parser    │────▶│ Normalizer  │────▶│ Aggregator  │────▶│   Report    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (locale)   │     │ (2 levels)  │     │ (32 cols)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rekap::{report_file, FieldMapping, ReportBundle, ReportOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ReportOptions::default();
//!     let result = report_file(Path::new("impor.csv"), &FieldMapping::default(), &options)?;
//!     let bundle = ReportBundle::new(result.sheets, result.diagnostics, options.period);
//!     println!("{}", bundle.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Records, group keys, rollup rows and report grids
//! - [`locale`] - Date and number parsing for regional exports
//! - [`parser`] - CSV/JSON reading with auto-detection
//! - [`transform`] - Mapping, normalization, aggregation and pipeline
//! - [`report`] - 32-column block and sheet layout
//! - [`output`] - JSON bundle and CSV sheet writers
//! - [`cache`] - Mapping profile registry
//! - [`logs`] - Progress log broadcaster

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod locale;
pub mod parser;

// Transformation
pub mod transform;

// Layout and output
pub mod output;
pub mod report;

// Caching
pub mod cache;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, OutputError, ProfileError, ReportError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cell,
    GroupKey1,
    GroupKey2,
    Level1Row,
    Level2Row,
    Month,
    RawCell,
    RawRow,
    Record,
    ReportGrid,
    GRAND_TOTAL_COLUMN,
    RECAP_START_COLUMN,
    TOTAL_COLUMNS,
};

// =============================================================================
// Re-exports - Locale
// =============================================================================

pub use locale::{parse_date, parse_number, DateFormat, NumberFormat};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    detect_delimiter,
    detect_encoding,
    decode_content,
    parse_bytes_auto,
    parse_csv,
    parse_file_auto,
    parse_json_rows,
    ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    aggregate,
    normalize_rows,
    Aggregation,
    Diagnostics,
    Field,
    FieldMapping,
    Normalizer,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    build_report,
    build_sheets,
    report_file,
    PartitionMode,
    PipelineResult,
    ReportOptions,
};

// =============================================================================
// Re-exports - Report and output
// =============================================================================

pub use report::{build_group_block, IncotermMode, SheetBuilder};
pub use output::{write_csv_sheets, write_json, ReportBundle};

// =============================================================================
// Re-exports - Registry (Cache)
// =============================================================================

pub use cache::{ProfileRegistry, StoredProfile};
