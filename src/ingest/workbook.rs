//! Excel workbook parsing (first worksheet only).

use super::{ingest_error, into_table};
use crate::error::AnalysisError;
use crate::models::TabularPayload;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

pub(super) fn read_first_sheet(
    path: &Path,
    max_rows: usize,
) -> Result<TabularPayload, AnalysisError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ingest_error(path, e))?;

    let sheet_names = workbook.sheet_names();
    let first = sheet_names
        .first()
        .ok_or_else(|| ingest_error(path, "workbook has no worksheets"))?
        .clone();
    debug!("Reading worksheet '{}' of {}", first, sheet_names.len());

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ingest_error(path, e))?;

    let records = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());

    Ok(into_table(records, max_rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Amount".to_string())), "Amount");
        assert_eq!(cell_text(&Data::Float(100.0)), "100");
        assert_eq!(cell_text(&Data::Float(-12.5)), "-12.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }
}
