//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// dirtydata - LLM-powered second opinion for spreadsheets and PDFs
///
/// Sends a sample of a spreadsheet (or a whole PDF) to Claude for a
/// quantitative analysis, then asks for a pragmatic second opinion on it.
///
/// Examples:
///   dirtydata ledger.xlsx
///   dirtydata export.csv --format json -o audit.json
///   dirtydata statement.pdf --no-save
///   dirtydata big.csv --dry-run
///   dirtydata --request body.json
///   dirtydata --history
///   dirtydata --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Spreadsheet (.xlsx, .xls, .csv, .tsv) or PDF to analyze
    #[arg(
        value_name = "FILE",
        required_unless_present_any = ["request", "history", "show", "delete", "init_config"]
    )]
    pub file: Option<PathBuf>,

    /// Model to use for both passes
    ///
    /// Can also be set via DIRTYDATA_MODEL env var or .dirtydata.toml config.
    #[arg(short, long, env = "DIRTYDATA_MODEL")]
    pub model: Option<String>,

    /// Messages API base URL
    #[arg(long, env = "ANTHROPIC_BASE_URL")]
    pub api_url: Option<String>,

    /// API key for the model provider
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dirtydata.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not save the analysis to history
    #[arg(long)]
    pub no_save: bool,

    /// Dry run: parse and sample the file without calling the model
    ///
    /// Prints the message the primary pass would send and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Answer a JSON request body and print the JSON response
    #[arg(long, value_name = "FILE", conflicts_with_all = ["file", "dry_run"])]
    pub request: Option<PathBuf>,

    /// List saved analyses, newest first
    #[arg(long, conflicts_with_all = ["file", "request", "show", "delete"])]
    pub history: bool,

    /// Maximum number of analyses listed by --history
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Show a saved analysis
    #[arg(long, value_name = "ID", conflicts_with_all = ["file", "request", "delete"])]
    pub show: Option<String>,

    /// Delete a saved analysis
    #[arg(long, value_name = "ID", conflicts_with_all = ["file", "request"])]
    pub delete: Option<String>,

    /// Generate a default .dirtydata.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// What a single invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Analyze(PathBuf),
    Request(PathBuf),
    History,
    Show(String),
    Delete(String),
    InitConfig,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command selected by the flags.
    pub fn command(&self) -> Command {
        if self.init_config {
            Command::InitConfig
        } else if let Some(ref path) = self.request {
            Command::Request(path.clone())
        } else if self.history {
            Command::History
        } else if let Some(ref id) = self.show {
            Command::Show(id.clone())
        } else if let Some(ref id) = self.delete {
            Command::Delete(id.clone())
        } else {
            Command::Analyze(self.file.clone().unwrap_or_default())
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref api_url) = self.api_url {
            if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(limit) = self.limit {
            if limit == 0 {
                return Err("Limit must be at least 1".to_string());
            }
        }

        match self.command() {
            Command::Analyze(path) => {
                if !path.is_file() {
                    return Err(format!("File does not exist: {}", path.display()));
                }
                crate::ingest::detect_file_type(&path).map_err(|e| e.to_string())?;
            }
            Command::Request(path) => {
                if !path.is_file() {
                    return Err(format!("Request file does not exist: {}", path.display()));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn make_args() -> Args {
        Args {
            file: None,
            model: None,
            api_url: None,
            api_key: None,
            config: None,
            output: None,
            format: None,
            timeout: None,
            no_save: false,
            dry_run: false,
            request: None,
            history: false,
            limit: None,
            show: None,
            delete: None,
            init_config: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_command_selection() {
        let mut args = make_args();
        args.file = Some(PathBuf::from("ledger.csv"));
        assert_eq!(args.command(), Command::Analyze(PathBuf::from("ledger.csv")));

        args.history = true;
        assert_eq!(args.command(), Command::History);

        args.init_config = true;
        assert_eq!(args.command(), Command::InitConfig);
    }

    #[test]
    fn test_validation_missing_file() {
        let mut args = make_args();
        args.file = Some(PathBuf::from("/no/such/file.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.docx");
        std::fs::write(&path, "x").unwrap();

        let mut args = make_args();
        args.file = Some(path.clone());
        let err = args.validate().unwrap_err();
        assert!(err.contains(".docx"));

        let csv = temp_dir.path().join("data.csv");
        std::fs::write(&csv, "a,b\n1,2\n").unwrap();
        args.file = Some(csv);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.history = true;
        args.api_url = Some("api.anthropic.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.history = true;
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_limits() {
        let mut args = make_args();
        args.history = true;
        args.limit = Some(0);
        assert!(args.validate().is_err());

        args.limit = None;
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from(["dirtydata", "ledger.csv", "--format", "json", "--no-save"])
            .unwrap();
        assert_eq!(args.file, Some(PathBuf::from("ledger.csv")));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.no_save);

        assert!(Args::try_parse_from(["dirtydata", "--history"]).is_ok());
        assert!(Args::try_parse_from(["dirtydata", "--history", "ledger.csv"]).is_err());
    }
}
