//! LLM agent modules for data analysis.
//!
//! This module provides the model client, the prompt contract and the
//! dual-pass analyzer built on top of them.

pub mod analyzer;
pub mod client;
pub mod parse;
pub mod prompts;

pub use analyzer::{AnalyzerConfig, DualPassAnalyzer, Stage};
pub use client::{AnthropicClient, ClientConfig, ModelClient};
pub use prompts::RowCaps;
