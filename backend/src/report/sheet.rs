//! Sheet assembly: group blocks plus the sheet-wide recap sections.

use std::collections::BTreeMap;

use crate::models::{
    Cell, GroupBlockMeta, Level1Row, ReportGrid, GRAND_TOTAL_COLUMN, ID_COLUMNS, TOTAL_COLUMNS,
};

use super::layout::{
    blank_row, month_header_row, monthly_total_row, positive_or_dash, quarterly_total_row,
    title_row, GroupBlock,
};

/// Title of the per-item recap section.
pub const ITEM_TABLE_TITLE: &str = "TOTAL PER ITEM";

/// (item, gsm, addOn)
type ItemKey = (String, String, String);

/// Collects group blocks for one sheet.
///
/// ```text
/// block 1
/// <blank>
/// block 2
/// <blank>
/// Month ...                         RECAP
/// TOTAL ALL SUPPLIER PER MO
/// TOTAL ALL SUPPLIER PER QUARTAL
/// <blank>
/// TOTAL PER ITEM
/// Month ...                         RECAP
/// <item> <gsm> <addOn>  ...
/// ```
#[derive(Debug, Clone)]
pub struct SheetBuilder {
    name: String,
    /// "SUPPLIER" or "IMPORTER", as used in "TOTAL ALL ... PER MO".
    dimension: String,
    rows: Vec<Vec<Cell>>,
    groups: Vec<GroupBlockMeta>,
    monthly_totals: [f64; 12],
    items: BTreeMap<ItemKey, [f64; 12]>,
}

impl SheetBuilder {
    pub fn new(name: impl Into<String>, dimension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: dimension.into(),
            rows: Vec::new(),
            groups: Vec::new(),
            monthly_totals: [0.0; 12],
            items: BTreeMap::new(),
        }
    }

    pub fn block_count(&self) -> usize {
        self.groups.len()
    }

    /// Append a block and fold its Level-1 rows into the sheet totals.
    ///
    /// Empty blocks are ignored; returns whether the block was added.
    pub fn push_block(&mut self, block: GroupBlock, level1: &[Level1Row]) -> bool {
        if block.is_empty() {
            return false;
        }

        if !self.groups.is_empty() {
            self.rows.push(blank_row());
        }

        self.groups.push(GroupBlockMeta {
            label: block.label,
            start_row: self.rows.len(),
            header_row_count: block.header_row_count,
            data_row_count: block.data_row_count,
            has_following_group: false,
        });
        self.rows.extend(block.rows);

        for (total, block_total) in self.monthly_totals.iter_mut().zip(block.monthly_totals) {
            *total += block_total;
        }
        for row in level1 {
            let key = (row.key.item.clone(), row.key.gsm.clone(), row.key.add_on.clone());
            self.items.entry(key).or_insert([0.0; 12])[row.key.month.index()] += row.total_qty;
        }
        true
    }

    /// Close the sheet. `None` when no block was added.
    pub fn finish(mut self) -> Option<ReportGrid> {
        if self.groups.is_empty() {
            return None;
        }

        let last = self.groups.len() - 1;
        for (i, meta) in self.groups.iter_mut().enumerate() {
            meta.has_following_group = i < last;
        }

        self.rows.push(blank_row());
        let totals_row = self.rows.len();
        self.rows.push(month_header_row());
        self.rows.push(monthly_total_row(
            &format!("TOTAL ALL {} PER MO", self.dimension),
            &self.monthly_totals,
            Cell::Empty,
        ));
        self.rows.push(quarterly_total_row(
            &format!("TOTAL ALL {} PER QUARTAL", self.dimension),
            &self.monthly_totals,
            Cell::Empty,
        ));

        self.rows.push(blank_row());
        let item_table_row = self.rows.len();
        self.rows.push(title_row(ITEM_TABLE_TITLE));
        self.rows.push(month_header_row());
        for ((item, gsm, add_on), totals) in &self.items {
            self.rows.push(item_row(&format!("{} {} {}", item, gsm, add_on), totals));
        }

        Some(ReportGrid {
            name: self.name,
            rows: self.rows,
            total_columns: TOTAL_COLUMNS,
            groups: self.groups,
            totals_row: Some(totals_row),
            item_table_row: Some(item_table_row),
        })
    }
}

/// Per-item row: quantity per month, total in the TOTAL QTY recap column.
fn item_row(label: &str, totals: &[f64; 12]) -> Vec<Cell> {
    let mut row = vec![Cell::text(label)];
    row.resize(ID_COLUMNS, Cell::Empty);
    for qty in totals {
        row.push(positive_or_dash(*qty));
        row.push(Cell::Empty);
    }
    row.resize(TOTAL_COLUMNS, Cell::Empty);
    row[GRAND_TOTAL_COLUMN] = positive_or_dash(totals.iter().sum());
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Month, Record};
    use crate::report::layout::{build_group_block, IncotermMode};
    use crate::transform::aggregator::aggregate;

    fn record(month: Month, hs: &str, item: &str, gsm: &str, qty: f64) -> Record {
        Record {
            month: Some(month),
            hs_code: hs.into(),
            item: item.into(),
            gsm: gsm.into(),
            quantity: qty,
            unit_price: 1.0,
            ..Record::default()
        }
    }

    fn push(sheet: &mut SheetBuilder, label: &str, records: &[Record]) -> bool {
        let refs: Vec<&Record> = records.iter().collect();
        let agg = aggregate(refs.iter().copied());
        let block = build_group_block(label, "SUPPLIER", &agg, &refs, &IncotermMode::default());
        sheet.push_block(block, &agg.level1)
    }

    #[test]
    fn test_two_blocks() {
        let mut sheet = SheetBuilder::new("PT Kertas", "SUPPLIER");
        assert!(push(&mut sheet, "APP", &[
            record(Month::Jan, "4802", "HVS", "70", 10.0),
            record(Month::Feb, "4810", "HVS", "70", 5.0),
        ]));
        assert!(push(&mut sheet, "Sinar Mas", &[record(Month::Jan, "4802", "CARTON", "-", 4.0)]));
        let grid = sheet.finish().unwrap();

        assert!(grid.rows.iter().all(|row| row.len() == TOTAL_COLUMNS));
        assert_eq!(grid.groups.len(), 2);

        // Block 1: 2 header + 2 data + 2 totals, then a separator.
        assert_eq!(grid.groups[0].start_row, 0);
        assert!(grid.groups[0].has_following_group);
        assert_eq!(grid.rows[6], blank_row());
        assert_eq!(grid.groups[1].start_row, 7);
        assert!(!grid.groups[1].has_following_group);
        assert_eq!(grid.groups[1].data_row_count, 1);

        // Block 2 ends at 7 + 5, then blank, then the totals header.
        let totals_row = grid.totals_row.unwrap();
        assert_eq!(totals_row, 13);
        assert_eq!(grid.rows[totals_row][0], Cell::text("Month"));
        let per_mo = &grid.rows[totals_row + 1];
        assert_eq!(per_mo[0], Cell::text("TOTAL ALL SUPPLIER PER MO"));
        assert_eq!(per_mo[1], Cell::Empty);
        assert_eq!(per_mo[5], Cell::Number(14.0));
        assert_eq!(per_mo[7], Cell::Number(5.0));
        assert_eq!(per_mo[31], Cell::Number(19.0));
        let per_q = &grid.rows[totals_row + 2];
        assert_eq!(per_q[0], Cell::text("TOTAL ALL SUPPLIER PER QUARTAL"));
        assert_eq!(per_q[5], Cell::Number(19.0));
        assert_eq!(per_q[11], Cell::dash());

        let item_row = grid.item_table_row.unwrap();
        assert_eq!(item_row, totals_row + 4);
        assert_eq!(grid.rows[item_row][0], Cell::text(ITEM_TABLE_TITLE));
        // Items sorted by (item, gsm, addOn); hsCode dropped.
        assert_eq!(grid.rows[item_row + 2][0], Cell::text("CARTON - -"));
        assert_eq!(grid.rows[item_row + 3][0], Cell::text("HVS 70 -"));
        assert_eq!(grid.rows[item_row + 3][5], Cell::Number(10.0));
        assert_eq!(grid.rows[item_row + 3][7], Cell::Number(5.0));
        assert_eq!(grid.rows[item_row + 3][31], Cell::Number(15.0));
        assert_eq!(grid.rows.len(), item_row + 4);
    }

    #[test]
    fn test_empty_blocks_are_skipped() {
        let mut sheet = SheetBuilder::new("Data_Tanpa_Importer", "SUPPLIER");
        let excluded = Record { quantity: 3.0, ..Record::default() };
        assert!(!push(&mut sheet, "Unknown", &[excluded]));
        assert_eq!(sheet.block_count(), 0);
        assert!(sheet.finish().is_none());
    }

    #[test]
    fn test_importer_dimension_labels() {
        let mut sheet = SheetBuilder::new("APP", "IMPORTER");
        push(&mut sheet, "PT A", &[record(Month::Okt, "4802", "HVS", "70", 2.0)]);
        let grid = sheet.finish().unwrap();
        let totals_row = grid.totals_row.unwrap();
        assert_eq!(grid.rows[totals_row + 1][0], Cell::text("TOTAL ALL IMPORTER PER MO"));
        assert_eq!(grid.rows[totals_row + 2][0], Cell::text("TOTAL ALL IMPORTER PER QUARTAL"));
        assert_eq!(grid.rows[totals_row + 2][23], Cell::Number(2.0));
    }
}
