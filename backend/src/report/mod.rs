//! Report layout: rollup tables → fixed 32-column grids.
//!
//! - [`layout`] - one group block (headers, product rows, block totals)
//! - [`sheet`] - blocks joined into a sheet with sheet-wide and per-item recaps

pub mod layout;
pub mod sheet;

pub use layout::{build_group_block, extract_incoterm, GroupBlock, IncotermMode};
pub use sheet::SheetBuilder;
