//! Parsing of model replies into findings.
//!
//! Models are told to return bare JSON but sometimes wrap it in a markdown
//! code fence anyway, so replies are cleaned before parsing.

use crate::error::AnalysisError;
use crate::models::{PrimaryFinding, ReviewFinding};
use serde::de::DeserializeOwned;

/// Strip a surrounding ```` ``` ```` or ```` ```json ```` fence and whitespace.
pub fn clean_response(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        body = rest.trim_start();
    }

    if let Some(rest) = body.strip_suffix("```") {
        body = rest.trim_end();
    }

    body
}

fn parse_json<T: DeserializeOwned>(stage: &'static str, text: &str) -> Result<T, AnalysisError> {
    let body = clean_response(text);
    if body.is_empty() {
        return Err(AnalysisError::malformed(stage, "empty reply"));
    }
    serde_json::from_str(body).map_err(|e| AnalysisError::malformed(stage, e.to_string()))
}

/// Parse the primary pass reply.
pub fn parse_primary(text: &str) -> Result<PrimaryFinding, AnalysisError> {
    parse_json("primary", text)
}

/// Parse the review pass reply.
pub fn parse_review(text: &str) -> Result<ReviewFinding, AnalysisError> {
    parse_json("review", text)
}
