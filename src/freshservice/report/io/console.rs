//! Plain-text rendering of report tables for verbose runs.

use crate::freshservice::report::flatten::ReportTable;

const COLUMN_GAP: &str = "  ";

/// Renders the table as aligned plain text, one line per row, with a
/// zero-based row index in front like a data frame printout.
pub fn render_table(table: &ReportTable) -> String {
    let widths = table.content_widths();
    let index_width = table.rows.len().saturating_sub(1).to_string().len();

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(render_line(
        &" ".repeat(index_width),
        table.columns.iter().map(String::as_str),
        &widths,
    ));
    for (row_idx, row) in table.rows.iter().enumerate() {
        let index = format!("{row_idx:<index_width$}");
        lines.push(render_line(&index, row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn render_line<'a>(index: &str, cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = index.to_string();
    for (cell, &width) in cells.zip(widths) {
        line.push_str(COLUMN_GAP);
        line.push_str(&format!("{cell:<width$}"));
    }
    line.trim_end().to_string()
}
