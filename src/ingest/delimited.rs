//! CSV and TSV parsing.

use super::{ingest_error, into_table};
use crate::error::AnalysisError;
use crate::models::TabularPayload;
use std::path::Path;

/// Read a delimited text file. The first non-empty record is the header.
pub(super) fn read_table(
    path: &Path,
    delimiter: u8,
    max_rows: usize,
) -> Result<TabularPayload, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ingest_error(path, e))?;

    let mut records = Vec::new();
    // Invalid UTF-8 (Latin-1 exports) decodes to U+FFFD instead of failing.
    for result in reader.byte_records() {
        let record = result.map_err(|e| ingest_error(path, e))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        records.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect::<Vec<_>>(),
        );
    }

    Ok(into_table(records, max_rows))
}
