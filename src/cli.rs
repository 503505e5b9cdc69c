//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Rating;
use clap::Parser;
use std::path::PathBuf;

/// TokenRisk - aggregated risk score for DeFi tokens
///
/// Reads a price oracle, on-chain token state, an LLM contract audit and an
/// LLM sentiment check, then combines them into a 0-100 risk score with a
/// SAFE / CAUTION / AVOID rating.
///
/// Examples:
///   tokenrisk --token 0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7
///   tokenrisk --token 0x... --feed 0x... --format markdown --output report.md
///   tokenrisk --token 0x... --skip audit,sentiment --fail-on avoid
///   tokenrisk --token 0x... --from-results bundle.json
///   tokenrisk --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Token contract address to assess (0x + 40 hex chars)
    #[arg(short, long, value_name = "ADDRESS", required_unless_present = "init_config")]
    pub token: Option<String>,

    /// Price-feed oracle address for the token
    ///
    /// Without a feed the price signal is left out of the report.
    #[arg(short, long, value_name = "ADDRESS", env = "PRICE_FEED_ADDRESS")]
    pub feed: Option<String>,

    /// Token name used for sentiment analysis (defaults to the on-chain name)
    #[arg(long)]
    pub name: Option<String>,

    /// Token symbol used for sentiment analysis (defaults to the on-chain symbol)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Project description used for sentiment analysis
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Contract source or ABI file handed to the auditor
    #[arg(long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Producers to skip (comma-separated)
    ///
    /// Example: --skip audit,sentiment
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub skip: Vec<ProducerKind>,

    /// Re-score a saved producer bundle (JSON) without network access
    #[arg(long, value_name = "FILE", conflicts_with_all = ["source", "skip"])]
    pub from_results: Option<PathBuf>,

    /// JSON-RPC endpoint of the EVM node
    #[arg(long, value_name = "URL", env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Block explorer API base URL
    #[arg(long, value_name = "URL", env = "EXPLORER_BASE_URL")]
    pub explorer_url: Option<String>,

    /// Block explorer API key
    #[arg(long, value_name = "KEY", env = "EXPLORER_API_KEY", hide_env_values = true)]
    pub explorer_api_key: Option<String>,

    /// API key for the LLM endpoint
    #[arg(long, value_name = "KEY", env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// LLM model name
    #[arg(short, long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Request timeout in seconds for every external call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Exit with code 2 when the rating is at or above this level
    ///
    /// Useful for CI pipelines. Values: caution, avoid
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tokenrisk.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .tokenrisk.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full report envelope as JSON (default)
    #[default]
    Json,
    /// Markdown document
    Markdown,
    /// Short plain-text summary
    Text,
}

impl OutputFormat {
    /// Parse a format name as written in the config file.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

/// Rating threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Caution,
    Avoid,
}

impl FailOnLevel {
    /// Whether `rating` meets or exceeds this threshold.
    pub fn is_triggered_by(self, rating: Rating) -> bool {
        let threshold = match self {
            FailOnLevel::Caution => Rating::Caution,
            FailOnLevel::Avoid => Rating::Avoid,
        };
        rating >= threshold
    }
}

/// A data producer that can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ProducerKind {
    Price,
    Chain,
    Audit,
    Sentiment,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let token = self.token.as_deref().unwrap_or("");
        if !is_evm_address(token) {
            return Err(format!(
                "Token address must be 0x followed by 40 hex characters, got '{}'",
                token
            ));
        }

        if let Some(ref feed) = self.feed {
            if !is_evm_address(feed) {
                return Err(format!(
                    "Feed address must be 0x followed by 40 hex characters, got '{}'",
                    feed
                ));
            }
        }

        for url in [&self.rpc_url, &self.explorer_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        for path in [&self.source, &self.from_results].into_iter().flatten() {
            if !path.is_file() {
                return Err(format!("File does not exist: {}", path.display()));
            }
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

/// `0x` followed by exactly 40 hex digits, either case.
pub fn is_evm_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7";

    fn make_args() -> Args {
        Args {
            token: Some(TOKEN.to_string()),
            feed: None,
            name: None,
            symbol: None,
            description: None,
            source: None,
            skip: Vec::new(),
            from_results: None,
            rpc_url: None,
            explorer_url: None,
            explorer_api_key: None,
            llm_api_key: None,
            model: None,
            timeout: None,
            format: None,
            output: None,
            fail_on: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_evm_address_shape() {
        assert!(is_evm_address(TOKEN));
        assert!(is_evm_address("0x0000000000000000000000000000000000000000"));
        assert!(!is_evm_address("B31f66AA3C1e785363F0875A1B74E27b85FD66c7"));
        assert!(!is_evm_address("0x1234"));
        assert!(!is_evm_address("0xZZ1f66AA3C1e785363F0875A1B74E27b85FD66c7"));
    }

    #[test]
    fn test_validation_invalid_token() {
        let mut args = make_args();
        args.token = Some("not-an-address".to_string());
        assert!(args.validate().is_err());

        args.token = None;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_feed() {
        let mut args = make_args();
        args.feed = Some("0x12".to_string());
        assert!(args.validate().is_err());

        args.feed = Some(TOKEN.to_lowercase());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_url_and_timeout() {
        let mut args = make_args();
        args.rpc_url = Some("localhost:8545".to_string());
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_source_file() {
        let mut args = make_args();
        args.source = Some(PathBuf::from("/definitely/not/here.sol"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.token = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_fail_on_threshold() {
        assert!(FailOnLevel::Caution.is_triggered_by(Rating::Caution));
        assert!(FailOnLevel::Caution.is_triggered_by(Rating::Avoid));
        assert!(!FailOnLevel::Caution.is_triggered_by(Rating::Safe));
        assert!(FailOnLevel::Avoid.is_triggered_by(Rating::Avoid));
        assert!(!FailOnLevel::Avoid.is_triggered_by(Rating::Caution));
    }

    #[test]
    fn test_skip_list() {
        let args = Args::parse_from(["tokenrisk", "--token", TOKEN, "--skip", "audit,sentiment"]);
        assert_eq!(args.skip, vec![ProducerKind::Audit, ProducerKind::Sentiment]);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_name("Markdown"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_name("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_name("txt"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_name("html"), None);
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
}
