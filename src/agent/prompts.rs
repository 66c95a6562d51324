//! Prompt templates and message builders for both passes.

use crate::agent::client::{ChatMessage, ContentBlock, DocumentSource, MessageContent};
use crate::analysis::{sample, PRIMARY_ROW_CAP, REVIEW_ROW_CAP};
use crate::models::{AnalysisInput, AnalysisRequest, PrimaryFinding, TabularPayload};

/// Row caps used when sampling tables for each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCaps {
    pub primary: usize,
    pub review: usize,
}

impl Default for RowCaps {
    fn default() -> Self {
        Self {
            primary: PRIMARY_ROW_CAP,
            review: REVIEW_ROW_CAP,
        }
    }
}

/// System prompt for the quantitative pass.
pub const PRIMARY_SYSTEM_PROMPT: &str = r#"You are the quant lens of a data audit team: a financial analyst and data quality specialist. You are precise, structured and numbers-first.

Analyze the uploaded data and reply with EXACTLY this JSON object and nothing else (no prose, no markdown, no code fences):

{
  "the_good": ["insight 1", "insight 2", "insight 3"],
  "the_bad": ["concern 1", "concern 2", "concern 3"],
  "the_dirty": [
    {"text": "finding 1", "why": "explanation 1"},
    {"text": "finding 2", "why": "explanation 2"}
  ],
  "summary": "One sentence describing what this data contains"
}

the_good: data quality wins, strong patterns, figures that check out.
the_bad: statistical red flags, quality problems, anomalies that point to real issues.
the_dirty: things that do not add up. Values that should not be there, patterns suggesting manipulation or entry errors, outliers that need an explanation.

Cite specific numbers, row labels, column names, amounts, percentages and patterns. A second analyst will review your work, so be thorough.

Return 2-5 items per list. Return ONLY valid JSON."#;

/// System prompt for the reviewer pass.
pub const REVIEW_SYSTEM_PROMPT: &str = r#"You are the pragmatist lens of a data audit team. You read between the lines and you know what people tend to hide and what everyone overlooks.

You are given another analyst's structured analysis of a dataset together with the original data. Give a second opinion.

You do not have to disagree. If the first analysis is right, say so. If it missed something, or focused on details and lost the bigger picture, call that out.

Reply with EXACTLY this JSON object and nothing else (no prose, no markdown, no code fences):

{
  "co_signs": ["a call from the first analysis worth highlighting", "another one"],
  "watch_outs": ["something missed or misread", "a different angle"],
  "bottom_line": "A short plain-English paragraph on what this data means and what the uploader should do next."
}

co_signs: 1-3 items. The strongest calls in the first analysis, and why they matter most.
watch_outs: 0-4 items. Misses, mistakes, or human insights a structured pass would not surface. May be empty.
bottom_line: 2-4 sentences, plain English, no jargon. Answer "so what?".

Be direct and conversational. Return ONLY valid JSON."#;

/// Build the user message for the primary pass.
pub fn primary_message(request: &AnalysisRequest, caps: RowCaps) -> ChatMessage {
    match &request.input {
        AnalysisInput::Document(doc) => ChatMessage::user(MessageContent::Blocks(vec![
            ContentBlock::Document {
                source: DocumentSource::base64(&doc.media_type, doc.base64()),
            },
            ContentBlock::Text {
                text: format!("Analyze this PDF document \"{}\".", request.file_name),
            },
        ])),
        AnalysisInput::Tabular(table) => ChatMessage::user(MessageContent::Text(
            primary_table_text(&request.file_name, table, caps.primary),
        )),
    }
}

/// Text body of the primary message for a table.
pub fn primary_table_text(file_name: &str, table: &TabularPayload, cap: usize) -> String {
    let digest = sample(table, cap);
    let note = digest
        .note()
        .map(|n| format!("\n{}", n))
        .unwrap_or_default();

    format!(
        "Analyze this spreadsheet \"{}\".\n\nFILE INFO:\n- Total rows: {}\n- Total columns: {}\n- Headers: {}{}\n\nDATA (first {} rows):\n{}",
        file_name,
        digest.total_rows,
        digest.total_cols,
        digest.header_line,
        note,
        cap,
        digest.rows_text()
    )
}

/// Build the user message for the review pass.
pub fn review_message(
    request: &AnalysisRequest,
    primary: &PrimaryFinding,
    caps: RowCaps,
) -> Result<ChatMessage, serde_json::Error> {
    let primary_json = serde_json::to_string_pretty(primary)?;

    let text = match &request.input {
        AnalysisInput::Document(_) => format!(
            "FIRST ANALYSIS:\n{}\n\nORIGINAL FILE: \"{}\" (PDF document. The raw content is not available to you; use the first analysis and its summary as context.)\n\nGive me your take.",
            primary_json, request.file_name
        ),
        AnalysisInput::Tabular(table) => {
            let digest = sample(table, caps.review);
            format!(
                "FIRST ANALYSIS:\n{}\n\nORIGINAL DATA from \"{}\":\n- {} rows, {} columns\n- Headers: {}\n- Sample (first {} rows):\n{}\n\nGive me your take.",
                primary_json,
                request.file_name,
                digest.total_rows,
                digest.total_cols,
                digest.header_line,
                caps.review,
                digest.rows_text()
            )
        }
    };

    Ok(ChatMessage::user(MessageContent::Text(text)))
}
