//! Flattening of enriched rows into a rectangular report table.

use std::collections::HashMap;

use crate::freshservice::report::model::EnrichedRow;

/// A rectangular table ready to be written to a spreadsheet or the console.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// Width in characters of the longest value (header included) per column.
    pub fn content_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(col_idx, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col_idx))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Flattens enriched rows into a table. Columns appear in the order they are
/// first seen; a row without a value for a column gets an empty cell.
pub fn build_table(rows: &[EnrichedRow]) -> ReportTable {
    let mut builder = TableBuilder::default();
    for row in rows {
        builder.push(row.cells());
    }
    builder.into_table()
}

#[derive(Default)]
struct TableBuilder {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<HashMap<usize, String>>,
}

impl TableBuilder {
    fn push(&mut self, cells: Vec<(String, String)>) {
        let mut values = HashMap::with_capacity(cells.len());
        for (column, value) in cells {
            let position = match self.positions.get(&column) {
                Some(position) => *position,
                None => {
                    let position = self.columns.len();
                    self.columns.push(column.clone());
                    self.positions.insert(column, position);
                    position
                }
            };
            values.insert(position, value);
        }
        self.rows.push(values);
    }

    fn into_table(self) -> ReportTable {
        let width = self.columns.len();
        let rows = self
            .rows
            .into_iter()
            .map(|mut values| {
                (0..width)
                    .map(|position| values.remove(&position).unwrap_or_default())
                    .collect()
            })
            .collect();

        ReportTable {
            columns: self.columns,
            rows,
        }
    }
}
