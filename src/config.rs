//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.storepulse.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".storepulse.toml";

/// Largest page the Admin API will serve.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Admin API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Pagination and retry settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "storepulse_report.md".to_string()
}

/// Admin API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Shop name or domain (e.g. "acme" or "acme.myshopify.com").
    #[serde(default)]
    pub shop: String,

    /// Admin API version.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Access token. Prefer the SHOPIFY_ACCESS_TOKEN environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            shop: String::new(),
            api_version: default_api_version(),
            timeout_seconds: default_timeout(),
            access_token: None,
        }
    }
}

fn default_api_version() -> String {
    "2024-10".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Pagination, pacing and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Orders per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum pages per run (bounds latency at page_size * max_pages orders).
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Delay before every page after the first, in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Retries per page on throttling or network failure.
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Backoff unit after a throttle, multiplied by the attempt number.
    #[serde(default = "default_throttle_backoff")]
    pub throttle_backoff_ms: u64,

    /// Backoff unit after a network failure, multiplied by the attempt number.
    #[serde(default = "default_network_backoff")]
    pub network_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            request_delay_ms: default_request_delay(),
            max_retries: default_retries(),
            throttle_backoff_ms: default_throttle_backoff(),
            network_backoff_ms: default_network_backoff(),
        }
    }
}

fn default_page_size() -> u32 {
    250
}

fn default_max_pages() -> u32 {
    20
}

fn default_request_delay() -> u64 {
    1500
}

fn default_retries() -> u32 {
    3
}

fn default_throttle_backoff() -> u64 {
    4000
}

fn default_network_backoff() -> u64 {
    3000
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Length of the top product and location lists.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Include the trend and anomaly section.
    #[serde(default = "default_true")]
    pub include_insights: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            include_insights: true,
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_true() -> bool {
    true
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.storepulse.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref shop) = args.shop {
            self.api.shop = shop.clone();
        }
        if let Some(ref token) = args.token {
            self.api.access_token = Some(token.clone());
        }
        if let Some(ref api_version) = args.api_version {
            self.api.api_version = api_version.clone();
        }

        if let Some(page_size) = args.page_size {
            self.fetch.page_size = page_size;
        }
        if let Some(max_pages) = args.max_pages {
            self.fetch.max_pages = max_pages;
        }
        if let Some(delay) = args.request_delay_ms {
            self.fetch.request_delay_ms = delay;
        }
        if let Some(retries) = args.max_retries {
            self.fetch.max_retries = retries;
        }

        if let Some(top_n) = args.top_n {
            self.report.top_n = top_n;
        }
        if args.no_insights {
            self.report.include_insights = false;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `--quiet` wins, then `--verbose` or
    /// `[general].verbose`, then INFO.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        match args.log_level() {
            tracing::Level::INFO if self.general.verbose => tracing::Level::DEBUG,
            level => level,
        }
    }

    /// Check the merged configuration before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.api.shop.trim().is_empty() {
            bail!("No shop configured. Pass --shop or set [api].shop in {}", CONFIG_FILE);
        }

        match self.api.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => bail!("No access token. Pass --token or set SHOPIFY_ACCESS_TOKEN"),
        }

        if self.fetch.page_size == 0 || self.fetch.page_size > MAX_PAGE_SIZE {
            bail!("Page size must be between 1 and {}", MAX_PAGE_SIZE);
        }

        if self.fetch.max_pages == 0 {
            bail!("Max pages must be at least 1");
        }

        if self.api.timeout_seconds == 0 {
            bail!("Timeout must be at least 1 second");
        }

        if self.report.top_n == 0 {
            bail!("Top-N list length must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
