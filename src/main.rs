//! dirtydata - a second opinion on spreadsheets and PDFs
//!
//! A CLI tool that sends a sample of a file to Claude for a quantitative
//! good / bad / dirty analysis, then asks a reviewer pass for the calls that
//! matter and a plain-English bottom line.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable file, failed primary pass, missing API key, etc.)

mod agent;
mod analysis;
mod boundary;
mod cli;
mod config;
mod error;
mod history;
mod ingest;
mod models;
mod report;

use agent::{AnalyzerConfig, AnthropicClient, ClientConfig, DualPassAnalyzer, RowCaps, Stage};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use history::{HistoryRecord, HistoryStore, JsonlHistoryStore};
use indicatif::{ProgressBar, ProgressStyle};
use ingest::{IngestConfig, Upload};
use models::{AnalysisInput, CombinedResult, FileInfo, Report, ReportMetadata};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("dirtydata v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .dirtydata.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to change the model, row caps, history location and report format.");
    Ok(())
}

/// Initialize logging on stderr so reports on stdout stay clean.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match args.command() {
        Command::Analyze(path) => run_analysis(&args, &config, &path).await,
        Command::Request(path) => run_request(&args, &config, &path).await,
        Command::History => handle_history(&config),
        Command::Show(id) => handle_show(&config, &id),
        Command::Delete(id) => handle_delete(&config, &id),
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// Analyze one file and emit the report.
async fn run_analysis(args: &Args, config: &Config, path: &Path) -> Result<i32> {
    let start_time = Instant::now();

    let upload = ingest::load_file(
        path,
        IngestConfig {
            max_rows: config.sampler.max_parsed_rows,
        },
    )?;

    if args.dry_run {
        return handle_dry_run(&upload, config);
    }

    let progress = if args.quiet { None } else { Some(spinner()?) };

    let mut analyzer = build_analyzer(args, config)?;
    if let Some(ref pb) = progress {
        let pb = pb.clone();
        analyzer = analyzer.with_observer(Box::new(move |stage| {
            if let Some(message) = stage_message(stage) {
                pb.set_message(message);
            }
        }));
    }

    let outcome = analyzer.analyze(&upload.request).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = outcome?;

    if result.review().is_none() && !args.quiet {
        eprintln!("⚠️  Second opinion unavailable; showing the first analysis only.");
    }

    let record_id = if config.history.enabled {
        save_to_history(config, &upload.info, &result)
    } else {
        debug!("History disabled, not saving");
        None
    };

    let report = Report {
        metadata: ReportMetadata {
            file: upload.info,
            analysis_date: Utc::now(),
            model_used: Some(config.model.name.clone()),
            record_id,
        },
        result,
    };

    emit_report(args, config.report.format, &report)?;
    info!(
        "Analysis finished in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(0)
}

/// Handle --dry-run: print what the primary pass would send, no model call.
fn handle_dry_run(upload: &Upload, config: &Config) -> Result<i32> {
    println!("🔍 Dry run: no model calls will be made.\n");

    match &upload.request.input {
        AnalysisInput::Tabular(table) => {
            let text = agent::prompts::primary_table_text(
                &upload.request.file_name,
                table,
                config.sampler.primary_rows,
            );
            println!("{}", text);
        }
        AnalysisInput::Document(doc) => {
            println!(
                "   {} would be sent as a {} document ({}).",
                upload.request.file_name,
                doc.media_type,
                report::generator::format_size(upload.info.file_size)
            );
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Handle --request: answer a JSON request body on stdout.
async fn run_request(args: &Args, config: &Config, path: &Path) -> Result<i32> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;

    let analyzer = build_analyzer(args, config)?;
    let response = boundary::respond(&analyzer, &body).await;

    println!("{}", serde_json::to_string_pretty(&response.body)?);
    debug!("Request answered with status {}", response.status);

    Ok(if response.is_success() { 0 } else { 1 })
}

fn handle_history(config: &Config) -> Result<i32> {
    let store = history_store(config);
    let records = store
        .list(config.history.list_limit)
        .context("Failed to read analysis history")?;

    print!("{}", report::generate_history_table(&records));
    Ok(0)
}

fn handle_show(config: &Config, id: &str) -> Result<i32> {
    let store = history_store(config);
    let Some(record) = store.get(id).context("Failed to read analysis history")? else {
        bail!("No saved analysis with id {}", id);
    };

    let report = Report {
        metadata: ReportMetadata {
            file: record.file,
            analysis_date: record.created_at,
            model_used: None,
            record_id: Some(record.id),
        },
        result: record.result,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };
    println!("{}", output);
    Ok(0)
}

fn handle_delete(config: &Config, id: &str) -> Result<i32> {
    let store = history_store(config);
    let existed = store
        .delete(id)
        .context("Failed to update analysis history")?;

    if existed {
        println!("🗑️  Deleted analysis {}", id);
        Ok(0)
    } else {
        eprintln!("No saved analysis with id {}", id);
        Ok(1)
    }
}

fn history_store(config: &Config) -> JsonlHistoryStore {
    JsonlHistoryStore::new(config.history.path.clone())
}

/// Save an analysis. Failures are logged and never abort the run.
fn save_to_history(config: &Config, file: &FileInfo, result: &CombinedResult) -> Option<String> {
    let store = history_store(config);
    match store.insert(HistoryRecord::new(file.clone(), result.clone())) {
        Ok(record) => {
            info!("Saved to history as {} ({})", record.id, store.path().display());
            Some(record.id)
        }
        Err(e) => {
            warn!("Could not save analysis to history: {}", e);
            None
        }
    }
}

/// Build the analyzer from configuration. Requires an API key.
fn build_analyzer(args: &Args, config: &Config) -> Result<DualPassAnalyzer> {
    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .context("No API key found. Set ANTHROPIC_API_KEY or pass --api-key")?;

    info!(
        "Model: {} ({}), timeout {}s",
        config.model.name, config.model.api_url, config.model.timeout_seconds
    );

    let client = AnthropicClient::new(ClientConfig {
        api_url: config.model.api_url.clone(),
        api_key,
        model_name: config.model.name.clone(),
        timeout_seconds: config.model.timeout_seconds,
    })?;

    let analyzer_config = AnalyzerConfig {
        primary_max_tokens: config.model.primary_max_tokens,
        review_max_tokens: config.model.review_max_tokens,
        row_caps: RowCaps {
            primary: config.sampler.primary_rows,
            review: config.sampler.review_rows,
        },
    };

    Ok(DualPassAnalyzer::new(Arc::new(client), analyzer_config))
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn stage_message(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::PrimaryInFlight => Some("Running the quantitative pass..."),
        Stage::SecondaryInFlight => Some("Getting a second opinion..."),
        _ => None,
    }
}

/// Render the report and write it to --output or stdout.
fn emit_report(args: &Args, format: OutputFormat, report: &Report) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Markdown => report::generate_markdown_report(report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
