//! Output writer: finished grids to a JSON bundle or CSV files.
//!
//! Sheet names are made unique here, not during layout: invalid characters
//! are replaced, names are cut to 31 characters and case-insensitive
//! duplicates get a `_N` suffix.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::error::OutputResult;
use crate::logs::{log_success, log_warning};
use crate::models::{Cell, ReportGrid};
use crate::transform::diagnostics::Diagnostics;

/// Longest sheet name spreadsheet formats accept.
pub const MAX_SHEET_NAME: usize = 31;

const INVALID_SHEET_CHARS: [char; 7] = ['*', '?', ':', '\\', '/', '[', ']'];

/// Replace characters spreadsheet formats reject with `_`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let clean: String = name
        .trim()
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if clean.is_empty() {
        "Sheet".to_string()
    } else {
        clean
    }
}

/// Hands out unique sheet names in emission order.
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitized, truncated and de-duplicated name for `raw`.
    pub fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        let mut candidate = truncate(&base, MAX_SHEET_NAME);
        let mut n = 1;
        while self.used.contains(&candidate.to_lowercase()) {
            let suffix = format!("_{}", n);
            candidate = format!("{}{}", truncate(&base, MAX_SHEET_NAME - suffix.len()), suffix);
            n += 1;
        }
        self.used.insert(candidate.to_lowercase());
        candidate
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// A grid with its final sheet name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedSheet {
    pub sheet_name: String,
    #[serde(flatten)]
    pub grid: ReportGrid,
}

/// Everything a spreadsheet writer needs for one report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Title row printed above every sheet, e.g. "2024 PERIODE".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sheets: Vec<NamedSheet>,
    pub diagnostics: Diagnostics,
}

impl ReportBundle {
    pub fn new(grids: Vec<ReportGrid>, diagnostics: Diagnostics, period: Option<String>) -> Self {
        let mut namer = SheetNamer::new();
        let sheets = grids
            .into_iter()
            .map(|grid| {
                let sheet_name = namer.assign(&grid.name);
                if sheet_name != grid.name {
                    log_warning(format!(
                        "Sheet name '{}' changed to '{}'",
                        grid.name, sheet_name
                    ));
                }
                NamedSheet { sheet_name, grid }
            })
            .collect();

        let period = period.filter(|p| !p.trim().is_empty());
        Self {
            title: period.as_ref().map(|p| format!("{} PERIODE", p.trim())),
            period,
            sheets,
            diagnostics,
        }
    }

    pub fn to_json(&self) -> OutputResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write the bundle as one JSON document.
pub fn write_json(bundle: &ReportBundle, path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bundle.to_json()?)?;
    log_success(format!("Saved {}", path.display()));
    Ok(())
}

/// Write one `<sheet name>.csv` per sheet into `dir`.
pub fn write_csv_sheets(bundle: &ReportBundle, dir: &Path) -> OutputResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(bundle.sheets.len());
    for sheet in &bundle.sheets {
        let path = dir.join(format!("{}.csv", sheet.sheet_name));
        let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;

        if let Some(title) = &bundle.title {
            writer.write_record([title.as_str()])?;
        }
        for row in &sheet.grid.rows {
            writer.write_record(row.iter().map(cell_text))?;
        }
        writer.flush()?;

        written.push(path);
    }

    log_success(format!("Saved {} CSV sheets to {}", written.len(), dir.display()));
    Ok(written)
}

/// Text form of a cell for CSV output.
pub fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.clone(),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Cell::Number(n) => n.to_string(),
    }
}
