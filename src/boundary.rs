//! JSON request/response boundary.
//!
//! A request body names the file and carries either a parsed table or a
//! base64 document. The response is the combined result on success and a
//! single `{"error": ...}` object otherwise; partial results never leave.

use crate::agent::DualPassAnalyzer;
use crate::error::AnalysisError;
use crate::models::AnalysisRequest;
use serde_json::{json, Value};
use tracing::{error, info};

/// Status and JSON body produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryResponse {
    pub status: u16,
    pub body: Value,
}

impl BoundaryResponse {
    fn error(err: &AnalysisError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "error": public_message(err) }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Client-facing error text. Upstream details stay in the log.
fn public_message(err: &AnalysisError) -> String {
    match err {
        AnalysisError::Upstream(_) => "Analysis failed: upstream model call failed".to_string(),
        AnalysisError::MalformedResponse { stage, .. } => {
            format!("Analysis failed: model returned a malformed {} response", stage)
        }
        other => other.to_string(),
    }
}

/// Decode a request body.
pub fn decode_request(body: &str) -> Result<AnalysisRequest, AnalysisError> {
    serde_json::from_str(body).map_err(|e| AnalysisError::UnsupportedInput(e.to_string()))
}

/// Answer one request body.
pub async fn respond(analyzer: &DualPassAnalyzer, body: &str) -> BoundaryResponse {
    let request = match decode_request(body) {
        Ok(request) => request,
        Err(e) => {
            error!("Rejected request: {}", e);
            return BoundaryResponse::error(&e);
        }
    };

    match analyzer.analyze(&request).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(body) => {
                info!("Answered request for {} (version {})", request.file_name, result.version());
                BoundaryResponse { status: 200, body }
            }
            Err(e) => BoundaryResponse::error(&AnalysisError::malformed("response", e.to_string())),
        },
        Err(e) => {
            error!("Analysis failed for {}: {}", request.file_name, e);
            BoundaryResponse::error(&e)
        }
    }
}
