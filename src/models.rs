//! Data models for the data auditor.
//!
//! This module contains the analysis input (tabular or document), the
//! findings returned by both model passes, and the combined result that is
//! rendered and stored.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Media type sent alongside document payloads.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Normalized file type of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Excel workbooks (.xlsx and .xls)
    Xlsx,
    /// Delimited text (.csv and .tsv)
    Csv,
    /// PDF documents
    Pdf,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Xlsx => write!(f, "xlsx"),
            FileType::Csv => write!(f, "csv"),
            FileType::Pdf => write!(f, "pdf"),
        }
    }
}

/// A parsed table: headers plus the rows that were kept.
///
/// `total_rows` counts every data row in the source, which may exceed
/// `rows.len()` when the parser stopped early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawTabularPayload")]
pub struct TabularPayload {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub total_cols: usize,
    pub truncated: bool,
}

impl TabularPayload {
    /// Build a payload from the kept rows and the source row count.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, total_rows: usize) -> Self {
        let total_rows = total_rows.max(rows.len());
        Self {
            total_cols: headers.len(),
            truncated: total_rows > rows.len(),
            headers,
            rows,
            total_rows,
        }
    }
}

/// Wire shape of a table. Cells may be any JSON scalar.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTabularPayload {
    #[serde(default, deserialize_with = "deserialize_cells")]
    headers: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_rows")]
    rows: Vec<Vec<String>>,
    #[serde(default)]
    total_rows: usize,
    #[serde(default)]
    total_cols: usize,
    #[serde(default)]
    truncated: bool,
}

impl From<RawTabularPayload> for TabularPayload {
    fn from(raw: RawTabularPayload) -> Self {
        let mut payload = TabularPayload::new(raw.headers, raw.rows, raw.total_rows);
        if raw.total_cols > 0 {
            payload.total_cols = raw.total_cols;
        }
        payload.truncated |= raw.truncated;
        payload
    }
}

/// Render a JSON scalar the way a spreadsheet cell reads.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(cell_text).collect())
}

fn deserialize_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<Value>> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect())
}

/// An opaque binary document and its declared media type.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPayload {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl DocumentPayload {
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: PDF_MEDIA_TYPE.to_string(),
        }
    }

    /// Standard base64 encoding of the payload, as the model API expects it.
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// What is being analyzed. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    Tabular(TabularPayload),
    Document(DocumentPayload),
}

/// A single analysis request: the file name and its content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RequestBody")]
pub struct AnalysisRequest {
    pub file_name: String,
    pub input: AnalysisInput,
}

impl AnalysisRequest {
    pub fn new(file_name: impl Into<String>, input: AnalysisInput) -> Self {
        Self {
            file_name: file_name.into(),
            input,
        }
    }
}

/// Request body accepted at the JSON boundary.
#[derive(Deserialize)]
struct RequestBody {
    #[serde(rename = "type")]
    kind: RequestKind,
    #[serde(rename = "fileName")]
    file_name: String,
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RequestKind {
    Pdf,
    Spreadsheet,
}

#[derive(Deserialize)]
struct PdfData {
    base64: String,
}

impl TryFrom<RequestBody> for AnalysisRequest {
    type Error = String;

    fn try_from(body: RequestBody) -> Result<Self, Self::Error> {
        let input = match body.kind {
            RequestKind::Pdf => {
                let data: PdfData = serde_json::from_value(body.data)
                    .map_err(|e| format!("invalid pdf data: {}", e))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.base64.trim())
                    .map_err(|e| format!("invalid base64 payload: {}", e))?;
                AnalysisInput::Document(DocumentPayload::pdf(bytes))
            }
            RequestKind::Spreadsheet => {
                let table: TabularPayload = serde_json::from_value(body.data)
                    .map_err(|e| format!("invalid spreadsheet data: {}", e))?;
                AnalysisInput::Tabular(table)
            }
        };

        Ok(AnalysisRequest {
            file_name: body.file_name,
            input,
        })
    }
}

/// A `the_dirty` element as the model may return it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DirtyItem {
    Text(String),
    TextWithReason {
        text: String,
        #[serde(default)]
        why: Option<String>,
    },
}

/// A normalized `the_dirty` finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DirtyItem")]
pub struct DirtyFinding {
    pub text: String,
    pub why: Option<String>,
}

impl From<DirtyItem> for DirtyFinding {
    fn from(item: DirtyItem) -> Self {
        match item {
            DirtyItem::Text(text) => DirtyFinding { text, why: None },
            DirtyItem::TextWithReason { text, why } => DirtyFinding { text, why },
        }
    }
}

/// Result of the quantitative (first) pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryFinding {
    pub the_good: Vec<String>,
    pub the_bad: Vec<String>,
    pub the_dirty: Vec<DirtyFinding>,
    pub summary: String,
}

impl PrimaryFinding {
    /// Names of list fields outside their advertised 2-5 item bounds.
    pub fn out_of_bounds(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !(2..=5).contains(&self.the_good.len()) {
            fields.push("the_good");
        }
        if !(2..=5).contains(&self.the_bad.len()) {
            fields.push("the_bad");
        }
        if !(2..=5).contains(&self.the_dirty.len()) {
            fields.push("the_dirty");
        }
        fields
    }
}

/// Result of the reviewer (second) pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub co_signs: Vec<String>,
    #[serde(default)]
    pub watch_outs: Vec<String>,
    pub bottom_line: String,
}

impl ReviewFinding {
    /// Names of list fields outside their advertised bounds.
    pub fn out_of_bounds(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !(1..=3).contains(&self.co_signs.len()) {
            fields.push("co_signs");
        }
        if self.watch_outs.len() > 4 {
            fields.push("watch_outs");
        }
        fields
    }
}

/// Both perspectives on one upload.
///
/// `version` is 2 exactly when a review is present. The fields are private
/// and deserialization recomputes the version, so the pair cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CombinedWire")]
pub struct CombinedResult {
    version: u8,
    primary: PrimaryFinding,
    review: Option<ReviewFinding>,
}

#[derive(Deserialize)]
struct CombinedWire {
    primary: PrimaryFinding,
    #[serde(default)]
    review: Option<ReviewFinding>,
}

impl From<CombinedWire> for CombinedResult {
    fn from(wire: CombinedWire) -> Self {
        CombinedResult::new(wire.primary, wire.review)
    }
}

impl CombinedResult {
    pub fn new(primary: PrimaryFinding, review: Option<ReviewFinding>) -> Self {
        let version = if review.is_some() { 2 } else { 1 };
        Self {
            version,
            primary,
            review,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn primary(&self) -> &PrimaryFinding {
        &self.primary
    }

    pub fn review(&self) -> Option<&ReviewFinding> {
        self.review.as_ref()
    }
}

/// Descriptive metadata about an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub file_type: FileType,
    /// Size in bytes.
    pub file_size: u64,
    pub row_count: usize,
    pub col_count: usize,
    #[serde(default)]
    pub truncated: bool,
}

/// Metadata about an analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// The analyzed file.
    pub file: FileInfo,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the model used, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// History id, when the analysis was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// A rendered-ready analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub result: CombinedResult,
}
