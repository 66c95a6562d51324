//! Error types for the analysis pipeline and the history log.
//!
//! Whether an error is fatal depends on where it is raised: the same
//! `Upstream` error aborts a primary pass but only degrades a review pass.

use thiserror::Error;

/// Errors raised while preparing or running an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Transport or API-level failure of a model call.
    #[error("upstream model call failed: {0}")]
    Upstream(String),

    /// The model replied, but not in the required JSON shape.
    #[error("model returned a malformed {stage} response: {reason}")]
    MalformedResponse { stage: &'static str, reason: String },

    /// The input was rejected before reaching the analyzer.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// A supported file could not be read or parsed.
    #[error("failed to read {path}: {reason}")]
    Ingest { path: String, reason: String },
}

impl AnalysisError {
    pub fn malformed(stage: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedResponse {
            stage,
            reason: reason.into(),
        }
    }

    /// HTTP-style status used when the error crosses the request boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::UnsupportedInput(_) => 400,
            _ => 500,
        }
    }
}

/// Errors raised by a history store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
