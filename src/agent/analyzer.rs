//! Dual-pass analysis.
//!
//! A primary quantitative pass is followed by a reviewer pass that sees the
//! primary result and a smaller sample of the data. Primary failures abort
//! the analysis; review failures only drop the review.

use crate::agent::client::{ChatMessage, ModelClient};
use crate::agent::parse::{parse_primary, parse_review};
use crate::agent::prompts::{
    primary_message, review_message, RowCaps, PRIMARY_SYSTEM_PROMPT, REVIEW_SYSTEM_PROMPT,
};
use crate::error::AnalysisError;
use crate::models::{AnalysisRequest, CombinedResult, PrimaryFinding, ReviewFinding};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub primary_max_tokens: u32,
    pub review_max_tokens: u32,
    pub row_caps: RowCaps,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            primary_max_tokens: 4000,
            review_max_tokens: 3000,
            row_caps: RowCaps::default(),
        }
    }
}

/// Progress of a single analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    PrimaryInFlight,
    PrimarySucceeded,
    SecondaryInFlight,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::PrimaryInFlight => write!(f, "primary in flight"),
            Stage::PrimarySucceeded => write!(f, "primary succeeded"),
            Stage::SecondaryInFlight => write!(f, "review in flight"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Callback invoked on every stage transition.
pub type StageObserver = Box<dyn Fn(Stage) + Send + Sync>;

/// Runs the primary and review passes against a model client.
pub struct DualPassAnalyzer {
    client: Arc<dyn ModelClient>,
    config: AnalyzerConfig,
    observer: Option<StageObserver>,
}

impl DualPassAnalyzer {
    pub fn new(client: Arc<dyn ModelClient>, config: AnalyzerConfig) -> Self {
        Self {
            client,
            config,
            observer: None,
        }
    }

    /// Report stage transitions to `observer` (used for progress display).
    pub fn with_observer(mut self, observer: StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn enter(&self, stage: Stage) {
        debug!("Analysis stage: {}", stage);
        if let Some(ref observer) = self.observer {
            observer(stage);
        }
    }

    /// Run both passes. Only a primary failure is returned as an error.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<CombinedResult, AnalysisError> {
        info!("Analyzing {}", request.file_name);
        self.enter(Stage::Idle);

        self.enter(Stage::PrimaryInFlight);
        let primary = match self.run_primary(request).await {
            Ok(primary) => primary,
            Err(e) => {
                self.enter(Stage::Failed);
                return Err(e);
            }
        };
        self.enter(Stage::PrimarySucceeded);

        self.enter(Stage::SecondaryInFlight);
        let review = match self.run_review(request, &primary).await {
            Ok(review) => Some(review),
            Err(e) => {
                warn!("Review pass failed, returning primary analysis only: {}", e);
                None
            }
        };
        self.enter(Stage::Done);

        let result = CombinedResult::new(primary, review);
        info!("Analysis complete (version {})", result.version());
        Ok(result)
    }

    /// First pass: fatal on any failure.
    pub async fn run_primary(&self, request: &AnalysisRequest) -> Result<PrimaryFinding, AnalysisError> {
        let message = primary_message(request, self.config.row_caps);
        let reply = self
            .client
            .invoke(
                PRIMARY_SYSTEM_PROMPT,
                vec![message],
                self.config.primary_max_tokens,
            )
            .await?;

        let primary = parse_primary(&reply.text)?;
        let outside = primary.out_of_bounds();
        if !outside.is_empty() {
            debug!("Primary lists outside advertised bounds: {:?}", outside);
        }
        Ok(primary)
    }

    /// Second pass. The caller decides what a failure means.
    pub async fn run_review(
        &self,
        request: &AnalysisRequest,
        primary: &PrimaryFinding,
    ) -> Result<ReviewFinding, AnalysisError> {
        let message: ChatMessage = review_message(request, primary, self.config.row_caps)
            .map_err(|e| AnalysisError::malformed("review", e.to_string()))?;

        let reply = self
            .client
            .invoke(
                REVIEW_SYSTEM_PROMPT,
                vec![message],
                self.config.review_max_tokens,
            )
            .await?;

        let review = parse_review(&reply.text)?;
        let outside = review.out_of_bounds();
        if !outside.is_empty() {
            debug!("Review lists outside advertised bounds: {:?}", outside);
        }
        Ok(review)
    }
}
