//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.dirtydata.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".dirtydata.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Sampling settings.
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// History settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Messages API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Output token limit for the primary pass.
    #[serde(default = "default_primary_max_tokens")]
    pub primary_max_tokens: u32,

    /// Output token limit for the review pass.
    #[serde(default = "default_review_max_tokens")]
    pub review_max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_url: default_api_url(),
            primary_max_tokens: default_primary_max_tokens(),
            review_max_tokens: default_review_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_primary_max_tokens() -> u32 {
    4000
}

fn default_review_max_tokens() -> u32 {
    3000
}

fn default_timeout() -> u64 {
    120
}

/// How much of a table is parsed and sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Rows sent with the primary pass.
    #[serde(default = "default_primary_rows")]
    pub primary_rows: usize,

    /// Rows sent with the review pass.
    #[serde(default = "default_review_rows")]
    pub review_rows: usize,

    /// Rows kept when parsing a spreadsheet.
    #[serde(default = "default_max_parsed_rows")]
    pub max_parsed_rows: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            primary_rows: default_primary_rows(),
            review_rows: default_review_rows(),
            max_parsed_rows: default_max_parsed_rows(),
        }
    }
}

fn default_primary_rows() -> usize {
    crate::analysis::PRIMARY_ROW_CAP
}

fn default_review_rows() -> usize {
    crate::analysis::REVIEW_ROW_CAP
}

fn default_max_parsed_rows() -> usize {
    crate::ingest::DEFAULT_MAX_ROWS
}

/// History log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Save completed analyses.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path of the history log.
    #[serde(default = "default_history_path")]
    pub path: PathBuf,

    /// Records shown by `--history`.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_history_path(),
            list_limit: default_list_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_history_path() -> PathBuf {
    PathBuf::from(".dirtydata/history.jsonl")
}

fn default_list_limit() -> usize {
    50
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format.
    #[serde(default)]
    pub format: crate::cli::OutputFormat,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.model.api_url = api_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(limit) = args.limit {
            self.history.list_limit = limit;
        }
        if args.no_save {
            self.history.enabled = false;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "claude-sonnet-4-20250514");
        assert_eq!(config.model.primary_max_tokens, 4000);
        assert_eq!(config.model.review_max_tokens, 3000);
        assert_eq!(config.sampler.primary_rows, 100);
        assert_eq!(config.sampler.review_rows, 50);
        assert_eq!(config.sampler.max_parsed_rows, 500);
        assert!(config.history.enabled);
        assert_eq!(config.history.list_limit, 50);
        assert_eq!(config.report.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[model]
name = "claude-3-5-haiku-latest"
timeout_seconds = 30

[sampler]
primary_rows = 20

[history]
enabled = false
path = "/tmp/audits.jsonl"

[report]
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.model.name, "claude-3-5-haiku-latest");
        assert_eq!(config.model.timeout_seconds, 30);
        assert_eq!(config.model.api_url, "https://api.anthropic.com");
        assert_eq!(config.sampler.primary_rows, 20);
        assert_eq!(config.sampler.review_rows, 50);
        assert!(!config.history.enabled);
        assert_eq!(config.history.path, PathBuf::from("/tmp/audits.jsonl"));
        assert_eq!(config.report.format, OutputFormat::Json);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = crate::cli::tests::make_args();
        args.model = Some("other-model".to_string());
        args.timeout = Some(5);
        args.no_save = true;
        args.format = Some(OutputFormat::Json);

        config.merge_with_args(&args);

        assert_eq!(config.model.name, "other-model");
        assert_eq!(config.model.api_url, "https://api.anthropic.com");
        assert_eq!(config.model.timeout_seconds, 5);
        assert!(!config.history.enabled);
        assert_eq!(config.report.format, OutputFormat::Json);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[sampler]"));
        assert!(toml_str.contains("[history]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.sampler.max_parsed_rows, 500);
    }
}
