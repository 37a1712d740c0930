//! Spreadsheet test-data loading
//!
//! Every worksheet of the workbook is one sheet, named after its tab. The
//! first row holds the column headers.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;

use super::types::{Sheet, TestCase};

pub const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}

/// Load every worksheet of the workbook at `path`
pub fn load_workbook(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let mut sheets = Vec::new();
    for tab in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&tab)
            .with_context(|| format!("Failed to read sheet '{}' of {}", tab, path.display()))?;
        let cases = read_rows(range.rows());
        let name = tab.trim().to_lowercase();
        info!("Loaded {} rows from sheet '{}'", cases.len(), name);
        sheets.push(Sheet { name, cases });
    }

    if sheets.is_empty() {
        anyhow::bail!("Workbook {} has no sheets", path.display());
    }
    Ok(sheets)
}

/// Turn worksheet rows into cases: trimmed headers from the first row,
/// blank rows skipped, row numbers counted from the first data row
fn read_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Vec<TestCase> {
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => return Vec::new(),
    };

    let mut cases = Vec::new();
    for (idx, row) in rows.enumerate() {
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell_text(cell)))
            .collect();
        let case = TestCase::new(idx + 1, fields);
        if case.is_blank() {
            debug!("Skipping blank row {}", idx + 1);
            continue;
        }
        cases.push(case);
    }
    cases
}

/// Cell as the text a user typed; whole numbers lose the `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
