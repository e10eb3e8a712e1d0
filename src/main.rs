//! StorePulse - order analytics for storefront merchants
//!
//! A CLI tool that fetches a year of orders from the GraphQL Admin API
//! and writes an analytics report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, authentication, first page failure, etc.)
//!   2 - Order set truncated and --fail-on-truncation set

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use std::path::Path;
use std::time::Instant;
use storepulse::cli::{Args, OutputFormat};
use storepulse::config::{Config, CONFIG_FILE};
use storepulse::fetch::{graphql::endpoint_for, AdminApiClient, ApiClientConfig, PaginatorConfig, TokioDelay};
use storepulse::models::Report;
use storepulse::pipeline::{run_pipeline, PipelineConfig};
use storepulse::report;
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

    // Load configuration before logging so the file can raise verbosity
    let (mut config, config_problem) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(&args));

    info!("StorePulse v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Arguments: {:?}",
        Args {
            token: args.token.as_ref().map(|_| "<redacted>".to_string()),
            ..args.clone()
        }
    );
    if let Some(problem) = config_problem {
        warn!("Failed to load config: {}", problem);
    }

    match run_report(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .storepulse.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Set [api].shop there and export SHOPIFY_ACCESS_TOKEN.");
    Ok(())
}

/// Initialize logging at the merged verbosity level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
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

/// Run the complete fetch and report workflow. Returns exit code (0 or 2).
async fn run_report(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.validate()?;
    debug!("Configuration: {:?}", config.fetch);

    let year = args.year.unwrap_or_else(|| Utc::now().year());
    let endpoint = endpoint_for(&config.api.shop, &config.api.api_version);

    // Step 1: Connect
    println!("🔌 Connecting to {}", endpoint);
    let client = AdminApiClient::new(ApiClientConfig {
        endpoint,
        access_token: config.api.access_token.clone().unwrap_or_default(),
        timeout_seconds: config.api.timeout_seconds,
    })?;

    let pipeline_config = PipelineConfig {
        year,
        top_n: config.report.top_n,
        paginator: PaginatorConfig::from(&config.fetch),
        show_progress: !args.quiet,
    };

    // Step 2: Fetch and aggregate
    println!(
        "\n📥 Fetching {} orders (up to {} pages of {})...",
        year, config.fetch.max_pages, config.fetch.page_size
    );
    let result = run_pipeline(&client, &TokioDelay, &pipeline_config)
        .await
        .context("Failed to fetch orders")?;

    let truncated = result.fetch.truncation.is_some();

    // Step 3: Build the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let report = report::build_report(
        result,
        &config.api.shop,
        duration,
        config.report.include_insights,
    );

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = Path::new(&config.general.output);
    report::write_report(&output, output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    print_summary(&report);
    println!(
        "\n✅ Report complete! Saved to: {}",
        output_path.display()
    );

    if truncated && args.fail_on_truncation {
        eprintln!("\n⛔ Order set was truncated. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

fn print_summary(report: &Report) {
    let summary = &report.summary;
    let segments = &summary.customer_segments;

    println!("\n📊 {} Summary:", report.metadata.year);
    println!("   Orders: {}", summary.total_orders);
    println!(
        "   Revenue: {:.2} | Avg. order: {:.2}",
        summary.total_revenue, summary.average_order_value
    );
    println!(
        "   Fulfilled: {} | Paid: {}",
        summary.fulfilled_orders, summary.paid_orders
    );
    println!(
        "   Customers: 🆕 New: {} | 🔁 Returning: {} | ⭐ VIP: {}",
        segments.new, segments.returning, segments.vip
    );
    if let Some(top) = summary.top_products.first() {
        println!("   Best seller: {} ({} units)", top.title, top.quantity);
    }
    if let Some(ref truncation) = report.metadata.fetch.truncation {
        println!("   ⚠️  Partial data: {}", truncation);
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so an unreadable default file is handed
/// back as a message for the caller to log.
fn load_config(args: &Args) -> Result<(Config, Option<String>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, None));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, None)),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => Ok((Config::default(), Some(format!("{:#}", e)))),
    }
}
