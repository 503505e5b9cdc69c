//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tokenrisk.toml` files.

use crate::cli::{Args, OutputFormat};
use crate::producers::LlmConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tokenrisk.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// EVM node settings.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Block explorer settings.
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// LLM endpoint settings.
    #[serde(default)]
    pub llm: LlmSettings,

    /// Price oracle settings.
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file path; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Report format: json, markdown or text.
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            format: default_format(),
            verbose: false,
        }
    }
}

fn default_format() -> String {
    "json".to_string()
}

/// JSON-RPC node settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    #[serde(default = "default_rpc_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_seconds: default_rpc_timeout(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://api.avax-test.network/ext/bc/C/rpc".to_string()
}

fn default_rpc_timeout() -> u64 {
    15
}

/// Block explorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "default_explorer_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_explorer_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_explorer_url(),
            api_key: None,
            timeout_seconds: default_explorer_timeout(),
        }
    }
}

fn default_explorer_url() -> String {
    "https://api-testnet.snowtrace.io".to_string()
}

fn default_explorer_timeout() -> u64 {
    8
}

/// LLM settings as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Prefer the LLM_API_KEY env var over storing the key here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,

    /// Token budget for the contract audit reply.
    #[serde(default = "default_audit_max_tokens")]
    pub audit_max_tokens: u32,

    /// Token budget for the sentiment reply.
    #[serde(default = "default_sentiment_max_tokens")]
    pub sentiment_max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            model: default_model(),
            api_key: None,
            temperature: 0.0,
            timeout_seconds: default_llm_timeout(),
            audit_max_tokens: default_audit_max_tokens(),
            sentiment_max_tokens: default_sentiment_max_tokens(),
        }
    }
}

fn default_llm_url() -> String {
    LlmConfig::default().base_url
}

fn default_model() -> String {
    LlmConfig::default().model
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_audit_max_tokens() -> u32 {
    1024
}

fn default_sentiment_max_tokens() -> u32 {
    512
}

impl LlmSettings {
    /// Client configuration for these settings.
    pub fn client_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Price oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    /// Default oracle address when --feed is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Prior rounds read for volatility.
    #[serde(default = "default_history_rounds")]
    pub history_rounds: u64,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            address: None,
            history_rounds: default_history_rounds(),
        }
    }
}

fn default_history_rounds() -> u64 {
    7
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
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (including their env vars) take precedence over config
    /// file settings. Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.rpc_url {
            self.rpc.url = url.clone();
        }
        if let Some(ref url) = args.explorer_url {
            self.explorer.base_url = url.clone();
        }
        if let Some(ref key) = args.explorer_api_key {
            self.explorer.api_key = Some(key.clone());
        }
        if let Some(ref key) = args.llm_api_key {
            self.llm.api_key = Some(key.clone());
        }
        if let Some(ref model) = args.model {
            self.llm.model = model.clone();
        }
        if let Some(ref feed) = args.feed {
            self.price_feed.address = Some(feed.clone());
        }

        // Timeout applies to every external call
        if let Some(timeout) = args.timeout {
            self.rpc.timeout_seconds = timeout;
            self.explorer.timeout_seconds = timeout;
            self.llm.timeout_seconds = timeout;
        }

        if let Some(format) = args.format {
            self.general.format = format_name(format).to_string();
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Fill the LLM key from GROQ_API_KEY when nothing else set it.
    pub fn apply_env_fallbacks(&mut self) {
        if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            if let Ok(key) = std::env::var("GROQ_API_KEY") {
                self.llm.api_key = Some(key);
            }
        }
    }

    /// Effective output format. Unknown names fall back to JSON.
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.general.format).unwrap_or_default()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Markdown => "markdown",
        OutputFormat::Text => "text",
    }
}
