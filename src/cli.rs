//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// StorePulse - order analytics for storefront merchants
///
/// Fetch a year of orders from the GraphQL Admin API and roll them up into
/// monthly revenue, best sellers, top shipping cities and customer segments.
///
/// Examples:
///   storepulse --shop acme --year 2024
///   storepulse --shop acme.myshopify.com --format json --output 2024.json
///   storepulse --shop acme --max-pages 4 --fail-on-truncation
///   storepulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Shop name or domain
    ///
    /// A bare name like "acme" expands to acme.myshopify.com.
    #[arg(short, long, value_name = "SHOP", env = "STOREPULSE_SHOP")]
    pub shop: Option<String>,

    /// Admin API access token
    #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Admin API version (e.g. 2024-10)
    #[arg(long, value_name = "VERSION")]
    pub api_version: Option<String>,

    /// Calendar year to report on (defaults to the current year)
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .storepulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Orders per page (1-250)
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Maximum number of pages to fetch
    #[arg(long, value_name = "COUNT")]
    pub max_pages: Option<u32>,

    /// Delay between page requests in milliseconds
    #[arg(long, value_name = "MS")]
    pub request_delay_ms: Option<u64>,

    /// Retries per page on throttling or network failure
    #[arg(long, value_name = "COUNT")]
    pub max_retries: Option<u32>,

    /// Length of the top product and location lists
    #[arg(long, value_name = "COUNT")]
    pub top_n: Option<usize>,

    /// Leave the trend and anomaly section out of the report
    #[arg(long)]
    pub no_insights: bool,

    /// Exit with code 2 when the order set was truncated
    ///
    /// Truncation happens when the page cap is reached or upstream fails
    /// after the first page. Useful for scheduled exports.
    #[arg(long)]
    pub fail_on_truncation: bool,

    /// Generate a default .storepulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
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

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(year) = self.year {
            if !(2000..=2100).contains(&year) {
                return Err(format!("Year out of range: {}", year));
            }
        }

        if let Some(page_size) = self.page_size {
            if page_size == 0 || page_size > crate::config::MAX_PAGE_SIZE {
                return Err(format!(
                    "Page size must be between 1 and {}",
                    crate::config::MAX_PAGE_SIZE
                ));
            }
        }

        if self.max_pages == Some(0) {
            return Err("Max pages must be at least 1".to_string());
        }

        if self.top_n == Some(0) {
            return Err("Top-N must be at least 1".to_string());
        }

        if let Some(ref shop) = self.shop {
            if shop.trim().is_empty() || shop.contains(char::is_whitespace) {
                return Err(format!("Invalid shop: {:?}", shop));
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
