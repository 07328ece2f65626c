//! Transformation module.
//!
//! This module turns raw rows into report sheets:
//! - Mapping: logical fields to source column labels
//! - Normalizer: raw rows to canonical records
//! - Aggregator: two-level monthly rollup
//! - Pipeline: partitioning and the full report run

pub mod aggregator;
pub mod diagnostics;
pub mod mapping;
pub mod normalizer;
pub mod pipeline;

pub use aggregator::{aggregate, average_of_positive, summarize_level2, Aggregation};
pub use diagnostics::Diagnostics;
pub use mapping::{ColumnResolver, Field, FieldMapping};
pub use normalizer::{normalize_rows, NormalizeResult, Normalizer};
pub use pipeline::*;
