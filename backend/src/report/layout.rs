//! Group block layout.
//!
//! A block is the grid for one supplier (or importer) inside a sheet:
//!
//! ```text
//! SUPPLIER  HS CODE ITEM GSM ADD ON │ Jan        │ ... │ Des        │ RECAP
//!                                   │ PRICE QTY  │ ... │ PRICE QTY  │ AVG PRICE INCOTERM TOTAL QTY
//! APP       4802    HVS  70  -      │ 5.0   15   │ ... │ -     -    │ 6.5       FOB      35
//!           4810    HVS  80  -      │ ...
//! TOTAL QTY PER MO      -  -  -  -  │ 15    -    │ ... │ -     -    │ -         -        35
//! TOTAL QTY PER QUARTAL -  -  -  -  │ 35 (6 slots) ...               │ -         -        -
//! ```
//!
//! Every row is exactly [`TOTAL_COLUMNS`] wide.

use serde::{Deserialize, Serialize};

use crate::models::{
    Cell, GroupKey2, Month, Record, GRAND_TOTAL_COLUMN, ID_COLUMNS, SENTINEL, TOTAL_COLUMNS,
};
use crate::transform::aggregator::Aggregation;

/// Number of header rows at the top of each block.
pub const HEADER_ROW_COUNT: usize = 2;

/// How the INCOTERM recap column is filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "code", rename_all = "snake_case")]
pub enum IncotermMode {
    /// Same code on every row, trimmed and uppercased; blank reads "-".
    Manual(String),
    /// Per product key, from the first matching record's incoterms field.
    FromColumn,
}

impl Default for IncotermMode {
    fn default() -> Self {
        IncotermMode::Manual("FOB".to_string())
    }
}

/// Trim, uppercase and cut to 3 characters; shorter values give "-".
pub fn extract_incoterm(value: &str) -> String {
    let clean = value.trim().to_uppercase();
    if clean.chars().count() >= 3 {
        clean.chars().take(3).collect()
    } else {
        SENTINEL.to_string()
    }
}

/// Incoterm shown for one product key.
pub fn incoterm_for(key: &GroupKey2, records: &[&Record], mode: &IncotermMode) -> String {
    match mode {
        IncotermMode::Manual(code) => match code.trim() {
            "" => SENTINEL.to_string(),
            code => code.to_uppercase(),
        },
        IncotermMode::FromColumn => records
            .iter()
            .find(|r| r.group_key2() == *key)
            .map(|r| extract_incoterm(&r.incoterms))
            .unwrap_or_else(|| SENTINEL.to_string()),
    }
}

/// One laid-out group block.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBlock {
    pub label: String,
    pub rows: Vec<Vec<Cell>>,
    pub header_row_count: usize,
    /// Distinct product keys, one data row each.
    pub data_row_count: usize,
    /// Width of the first header row.
    pub header_width: usize,
    /// Sum of Level-1 quantities per month across the block.
    pub monthly_totals: [f64; 12],
    pub overall_total: f64,
}

impl GroupBlock {
    pub fn is_empty(&self) -> bool {
        self.data_row_count == 0
    }
}

/// Lay out one group.
///
/// `group_header` labels the first id column ("SUPPLIER" or "IMPORTER").
/// `records` are the group's records, used for per-key incoterms.
pub fn build_group_block(
    label: &str,
    group_header: &str,
    aggregation: &Aggregation,
    records: &[&Record],
    incoterm: &IncotermMode,
) -> GroupBlock {
    let mut rows = header_rows(group_header);
    let header_width = rows[0].len();
    let mut monthly_totals = [0.0; 12];

    // Level-2 rows are already sorted by (hsCode, item, gsm, addOn).
    for (index, l2) in aggregation.level2.iter().enumerate() {
        let key = &l2.key;
        let mut row = Vec::with_capacity(TOTAL_COLUMNS);
        row.push(if index == 0 { Cell::text(label) } else { Cell::Empty });
        row.push(Cell::text(key.hs_code.as_str()));
        row.push(Cell::text(key.item.as_str()));
        row.push(Cell::text(key.gsm.as_str()));
        row.push(Cell::text(key.add_on.as_str()));

        for month in Month::ALL {
            match aggregation.level1_for(key, month) {
                Some(l1) => {
                    row.push(nonzero_or_dash(l1.avg_price));
                    row.push(nonzero_or_dash(l1.total_qty));
                    monthly_totals[month.index()] += l1.total_qty;
                }
                None => {
                    row.push(Cell::dash());
                    row.push(Cell::dash());
                }
            }
        }

        row.push(nonzero_or_dash(l2.avg_of_summary_price));
        row.push(Cell::text(incoterm_for(key, records, incoterm)));
        row.push(nonzero_or_dash(l2.total_of_summary_qty));
        rows.push(row);
    }

    let data_row_count = aggregation.level2.len();
    let overall_total: f64 = monthly_totals.iter().sum();

    if data_row_count > 0 {
        rows.push(monthly_total_row("TOTAL QTY PER MO", &monthly_totals, Cell::dash()));
        rows.push(quarterly_total_row("TOTAL QTY PER QUARTAL", &monthly_totals, Cell::dash()));
    }

    GroupBlock {
        label: label.to_string(),
        rows,
        header_row_count: HEADER_ROW_COUNT,
        data_row_count,
        header_width,
        monthly_totals,
        overall_total,
    }
}

/// The two block header rows.
pub fn header_rows(group_header: &str) -> Vec<Vec<Cell>> {
    let mut first = vec![
        Cell::text(group_header),
        Cell::text("HS CODE"),
        Cell::text("ITEM"),
        Cell::text("GSM"),
        Cell::text("ADD ON"),
    ];
    let mut second = vec![Cell::Empty; ID_COLUMNS];

    for month in Month::ALL {
        first.push(Cell::text(month.label()));
        first.push(Cell::Empty);
        second.push(Cell::text("PRICE"));
        second.push(Cell::text("QTY"));
    }

    first.extend([Cell::text("RECAP"), Cell::Empty, Cell::Empty]);
    second.extend([Cell::text("AVG PRICE"), Cell::text("INCOTERM"), Cell::text("TOTAL QTY")]);
    vec![first, second]
}

/// `"Month"` header used by the sheet-wide sections.
pub fn month_header_row() -> Vec<Cell> {
    let mut row = vec![Cell::text("Month")];
    row.resize(ID_COLUMNS, Cell::Empty);
    for month in Month::ALL {
        row.push(Cell::text(month.label()));
        row.push(Cell::Empty);
    }
    row.extend([Cell::text("RECAP"), Cell::Empty, Cell::Empty]);
    row
}

/// Monthly totals row: one total per month pair, grand total in TOTAL QTY.
///
/// `filler` goes into every unused cell.
pub fn monthly_total_row(label: &str, totals: &[f64; 12], filler: Cell) -> Vec<Cell> {
    let mut row = labelled_row(label, &filler);
    for total in totals {
        row.push(positive_or_dash(*total));
        row.push(filler.clone());
    }
    row.resize(TOTAL_COLUMNS, filler);
    row[GRAND_TOTAL_COLUMN] = positive_or_dash(totals.iter().sum());
    row
}

/// Quarterly totals row: each quarter total spans the 6 cells of its months.
pub fn quarterly_total_row(label: &str, totals: &[f64; 12], filler: Cell) -> Vec<Cell> {
    let mut row = labelled_row(label, &filler);
    for quarter in quarter_totals(totals) {
        row.push(positive_or_dash(quarter));
        row.extend(std::iter::repeat(filler.clone()).take(5));
    }
    row.extend(std::iter::repeat(filler).take(3));
    row
}

/// Sums for months 1-3, 4-6, 7-9 and 10-12.
pub fn quarter_totals(totals: &[f64; 12]) -> [f64; 4] {
    let mut quarters = [0.0; 4];
    for month in Month::ALL {
        quarters[month.quarter()] += totals[month.index()];
    }
    quarters
}

pub fn blank_row() -> Vec<Cell> {
    vec![Cell::Empty; TOTAL_COLUMNS]
}

/// Row holding a single leading text cell.
pub fn title_row(title: &str) -> Vec<Cell> {
    let mut row = blank_row();
    row[0] = Cell::text(title);
    row
}

fn labelled_row(label: &str, filler: &Cell) -> Vec<Cell> {
    let mut row = Vec::with_capacity(TOTAL_COLUMNS);
    row.push(Cell::text(label));
    row.resize(ID_COLUMNS, filler.clone());
    row
}

/// Data cells: zero reads "-", negatives stay visible.
fn nonzero_or_dash(value: f64) -> Cell {
    if value != 0.0 {
        Cell::Number(value)
    } else {
        Cell::dash()
    }
}

/// Total cells: only positive totals are shown.
pub(crate) fn positive_or_dash(value: f64) -> Cell {
    if value > 0.0 {
        Cell::Number(value)
    } else {
        Cell::dash()
    }
}
