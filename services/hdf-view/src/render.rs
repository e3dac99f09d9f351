//! Console tables for listings, attributes and dataset windows.

use std::collections::BTreeMap;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use hdf_common::ContentsEntry;
use serde_json::Value;

/// Placeholder for a cell whose block never arrived.
pub const MISSING: &str = "…";

/// A rectangular window of a dataset, ready to print.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    /// Column header labels; empty when the view has no header row.
    pub col_labels: Vec<String>,
    /// Row header label (if any) and the cells of each row.
    pub rows: Vec<(Option<String>, Vec<String>)>,
}

/// Text for one cell. Strings print without quotes.
pub fn format_cell(value: Option<&Value>) -> String {
    match value {
        None => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub fn contents_table(entries: &[ContentsEntry]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Name", "Type", "Uri"]);

    for entry in entries {
        table.add_row(vec![
            entry.name.clone(),
            entry.kind.to_string(),
            entry.uri.clone(),
        ]);
    }

    table.to_string()
}

pub fn attrs_table(attrs: &BTreeMap<String, Value>) -> String {
    let mut table = new_table();
    table.set_header(vec!["Attribute", "Value"]);

    for (name, value) in attrs {
        table.add_row(vec![name.clone(), format_cell(Some(value))]);
    }

    table.to_string()
}

/// Render a window. The corner cell is left blank when both headers are
/// shown.
pub fn window_table(window: &Window) -> String {
    let mut table = new_table();
    let has_row_headers = window.rows.iter().any(|(label, _)| label.is_some());

    if !window.col_labels.is_empty() {
        let mut header = Vec::with_capacity(window.col_labels.len() + 1);
        if has_row_headers {
            header.push(String::new());
        }
        header.extend(window.col_labels.iter().cloned());
        table.set_header(header);
    }

    for (label, cells) in &window.rows {
        let mut row = Vec::with_capacity(cells.len() + 1);
        if has_row_headers {
            row.push(label.clone().unwrap_or_default());
        }
        row.extend(cells.iter().cloned());
        table.add_row(row);
    }

    table.to_string()
}
