//! Bounded text digests of tabular input.
//!
//! A digest is what the model actually sees of a spreadsheet: a header
//! line and at most `cap` numbered row lines. Row labels use the source
//! sheet's numbering, where row 1 is the header, so data row 0 is "Row 2".

use crate::models::TabularPayload;

/// Rows sent with the primary pass.
pub const PRIMARY_ROW_CAP: usize = 100;

/// Rows sent with the review pass.
pub const REVIEW_ROW_CAP: usize = 50;

/// Cell separator for header and row lines.
const SEPARATOR: &str = " | ";

/// A bounded rendering of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    /// Headers joined with `" | "`.
    pub header_line: String,
    /// One `Row <n>: ...` line per sampled row.
    pub row_lines: Vec<String>,
    /// Whether the source holds more rows than were sampled.
    pub truncated: bool,
    /// Number of data rows in the source.
    pub total_rows: usize,
    /// Number of columns in the source.
    pub total_cols: usize,
    /// Row cap this digest was built with.
    pub cap: usize,
}

impl Digest {
    /// Truncation annotation, present only when rows were dropped. Cites
    /// the number of row lines actually rendered.
    pub fn note(&self) -> Option<String> {
        self.truncated.then(|| {
            format!(
                "[NOTE: File has {} total rows. Showing first {}.]",
                self.total_rows,
                self.row_lines.len()
            )
        })
    }

    /// Row lines joined with newlines.
    pub fn rows_text(&self) -> String {
        self.row_lines.join("\n")
    }
}

/// Sample the first `cap` rows of a table.
pub fn sample(table: &TabularPayload, cap: usize) -> Digest {
    let total_rows = table.total_rows.max(table.rows.len());

    let row_lines = table
        .rows
        .iter()
        .take(cap)
        .enumerate()
        .map(|(i, row)| row_line(i, row))
        .collect();

    Digest {
        header_line: table.headers.join(SEPARATOR),
        row_lines,
        truncated: total_rows > cap,
        total_rows,
        total_cols: table.total_cols,
        cap,
    }
}

/// Render data row `index` (0-based) with its sheet row label.
fn row_line(index: usize, cells: &[String]) -> String {
    format!("Row {}: {}", index + 2, cells.join(SEPARATOR))
}
