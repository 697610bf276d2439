//! Styled `.xlsx` output for report tables.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use tracing::warn;

use crate::freshservice::report::error::Result;
use crate::freshservice::report::flatten::ReportTable;

/// Name of the single worksheet in the report workbook.
pub const REPORT_SHEET: &str = "Report";

const HEADER_BACKGROUND: u32 = 0x003366;
const ROW_BACKGROUND: u32 = 0xD9E1F2;
/// Extra characters added to the longest value of a column.
const WIDTH_PADDING: usize = 2;
/// Longest string Excel stores in a single cell.
pub const MAX_CELL_CHARS: usize = 32_767;
/// Widest column Excel accepts, in characters.
const MAX_COLUMN_WIDTH: usize = 255;

/// Writes the report table to `path` as a styled single-sheet workbook.
pub fn write_report(path: &Path, table: &ReportTable) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BACKGROUND))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let row_format = Format::new().set_background_color(Color::RGB(ROW_BACKGROUND));

    for (col_idx, header) in table.columns.iter().enumerate() {
        let header = fit_cell(header, 0, col_idx);
        worksheet.write_string_with_format(0, col_idx as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let cell = fit_cell(cell, row_idx + 1, col_idx);
            worksheet.write_string_with_format(
                (row_idx + 1) as u32,
                col_idx as u16,
                cell,
                &row_format,
            )?;
        }
    }

    for (col_idx, width) in table.content_widths().into_iter().enumerate() {
        let width = (width + WIDTH_PADDING).min(MAX_COLUMN_WIDTH);
        worksheet.set_column_width(col_idx as u16, width as f64)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Cuts `text` to [`MAX_CELL_CHARS`] characters so one oversized value does
/// not fail the whole workbook.
fn fit_cell(text: &str, row: usize, col: usize) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                row,
                col,
                chars = text.chars().count(),
                "cell exceeds the spreadsheet limit, truncating"
            );
            &text[..cut]
        }
        None => text,
    }
}
