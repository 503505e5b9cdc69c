//! TokenRisk - aggregated risk scoring for DeFi tokens
//!
//! A CLI tool that reads a price oracle, on-chain token state, an LLM
//! contract audit and an LLM sentiment check, and combines them into a
//! 0-100 risk score with a SAFE / CAUTION / AVOID rating.
//!
//! Exit codes:
//!   0 - Success (rating below --fail-on threshold, or no --fail-on set)
//!   1 - Invalid input or runtime error (config, I/O, etc.)
//!   2 - Rating at or above the --fail-on threshold

mod analysis;
mod cli;
mod config;
mod models;
mod pipeline;
mod producers;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::RiskReport;
use pipeline::{AssessmentRequest, Pipeline};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("TokenRisk v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Assessment failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tokenrisk.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Set RPC_URL, EXPLORER_API_KEY and LLM_API_KEY in the environment for secrets.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Assess the token and write the report. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.apply_env_fallbacks();

    let now = Utc::now();

    let report = match args.from_results {
        Some(ref path) => {
            info!("Re-scoring saved results from {}", path.display());
            let token = pipeline::validate_address("token", args.token.as_deref().unwrap_or(""))?;
            let bundle = pipeline::load_bundle(path)?;
            report::build_report(&token, bundle, now)
        }
        None => {
            let request = AssessmentRequest::from_args(&args, &config)?;
            let pipeline = Pipeline::from_config(&config)?;

            let spinner = make_spinner(&args, config.general.output.is_some());
            let report = pipeline.assess(&request, now).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            report
        }
    };

    info!(
        "Risk score {}/100 [{}] in {:.1}s",
        report.risk_score.total,
        report.risk_score.rating,
        start_time.elapsed().as_secs_f64()
    );

    let output = render(&report, config.output_format())?;
    match config.general.output {
        Some(ref path) => {
            let path = PathBuf::from(path);
            std::fs::write(&path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                eprintln!("{}", report.summary);
                eprintln!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        if fail_level.is_triggered_by(report.risk_score.rating) {
            eprintln!(
                "\n⛔ Rating {} is at or above {:?}. Failing (exit code 2).",
                report.risk_score.rating, fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Render the report in the requested format.
fn render(report: &RiskReport, format: OutputFormat) -> Result<String> {
    let mut output = match format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Markdown => report::generate_markdown_report(report),
        OutputFormat::Text => report::generate_text_report(report),
    };
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

/// Spinner shown on stderr while producers run.
fn make_spinner(args: &Args, writes_file: bool) -> Option<ProgressBar> {
    if args.quiet || !writes_file {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Collecting oracle, chain, audit and sentiment signals...");
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
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
