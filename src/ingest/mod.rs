//! File ingestion: turning an uploaded file into an analysis request.
//!
//! Spreadsheets are parsed into a table, keeping at most `max_rows` data
//! rows; PDFs are passed through as raw bytes.

mod delimited;
mod workbook;

use crate::error::AnalysisError;
use crate::models::{AnalysisInput, AnalysisRequest, DocumentPayload, FileInfo, FileType, TabularPayload};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Rows kept from a parsed spreadsheet.
pub const DEFAULT_MAX_ROWS: usize = 500;

/// A parsed upload, ready for analysis.
#[derive(Debug, Clone)]
pub struct Upload {
    pub request: AnalysisRequest,
    pub info: FileInfo,
}

/// Parser settings for uploads.
#[derive(Debug, Clone, Copy)]
pub struct IngestConfig {
    pub max_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// Supported source formats, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Workbook,
    Csv,
    Tsv,
    Pdf,
}

impl SourceFormat {
    fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xlsx" | "xls" => Ok(SourceFormat::Workbook),
            "csv" => Ok(SourceFormat::Csv),
            "tsv" => Ok(SourceFormat::Tsv),
            "pdf" => Ok(SourceFormat::Pdf),
            "" => Err(AnalysisError::UnsupportedInput(format!(
                "file has no extension: {}",
                path.display()
            ))),
            other => Err(AnalysisError::UnsupportedInput(format!(
                "Unsupported file type: .{}",
                other
            ))),
        }
    }

    fn file_type(self) -> FileType {
        match self {
            SourceFormat::Workbook => FileType::Xlsx,
            SourceFormat::Csv | SourceFormat::Tsv => FileType::Csv,
            SourceFormat::Pdf => FileType::Pdf,
        }
    }
}

/// Detect the normalized file type of `path` from its extension.
pub fn detect_file_type(path: &Path) -> Result<FileType, AnalysisError> {
    SourceFormat::from_path(path).map(SourceFormat::file_type)
}

/// Read and parse a file into an analysis request.
pub fn load_file(path: &Path, config: IngestConfig) -> Result<Upload, AnalysisError> {
    let format = SourceFormat::from_path(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let file_size = fs::metadata(path)
        .map_err(|e| ingest_error(path, e))?
        .len();

    info!("Reading {} ({} bytes)", file_name, file_size);

    let input = match format {
        SourceFormat::Pdf => {
            let bytes = fs::read(path).map_err(|e| ingest_error(path, e))?;
            AnalysisInput::Document(DocumentPayload::pdf(bytes))
        }
        SourceFormat::Csv => {
            AnalysisInput::Tabular(delimited::read_table(path, b',', config.max_rows)?)
        }
        SourceFormat::Tsv => {
            AnalysisInput::Tabular(delimited::read_table(path, b'\t', config.max_rows)?)
        }
        SourceFormat::Workbook => {
            AnalysisInput::Tabular(workbook::read_first_sheet(path, config.max_rows)?)
        }
    };

    let (row_count, col_count, truncated) = match &input {
        AnalysisInput::Tabular(table) => (table.total_rows, table.total_cols, table.truncated),
        AnalysisInput::Document(_) => (0, 0, false),
    };

    debug!(
        "Parsed {}: {} rows, {} columns, truncated: {}",
        file_name, row_count, col_count, truncated
    );

    Ok(Upload {
        info: FileInfo {
            file_name: file_name.clone(),
            file_type: format.file_type(),
            file_size,
            row_count,
            col_count,
            truncated,
        },
        request: AnalysisRequest::new(file_name, input),
    })
}

/// Split parsed records into headers and at most `max_rows` data rows.
fn into_table<I>(records: I, max_rows: usize) -> TabularPayload
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut records = records.into_iter();
    let headers = records.next().unwrap_or_default();

    let mut rows = Vec::new();
    let mut total_rows = 0;
    for record in records {
        if rows.len() < max_rows {
            rows.push(record);
        }
        total_rows += 1;
    }

    TabularPayload::new(headers, rows, total_rows)
}

fn ingest_error(path: &Path, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Ingest {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
