//! Pipeline entry point: fetch a year of orders, then aggregate them.
//!
//! All inputs arrive as explicit parameters. The fetch stage decides between
//! complete, truncated and failed runs; aggregation runs over whatever
//! orders were collected.

use crate::analysis::summarize;
use crate::fetch::{processed_in_year, Delay, FetchError, OrderSource, Paginator, PaginatorConfig};
use crate::models::{AnalyticsSummary, FetchReport};
use tracing::{info, warn};

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Calendar year to report on.
    pub year: i32,
    /// Length of the top product and location lists.
    pub top_n: usize,
    /// Pagination, pacing and retry settings.
    pub paginator: PaginatorConfig,
    /// Show a progress spinner while fetching.
    pub show_progress: bool,
}

impl PipelineConfig {
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            top_n: crate::analysis::DEFAULT_TOP_N,
            paginator: PaginatorConfig::default(),
            show_progress: false,
        }
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub year: i32,
    pub summary: AnalyticsSummary,
    pub fetch: FetchReport,
}

/// Run the full pipeline.
///
/// Returns an error only when no orders could be fetched at all. A
/// truncated fetch still produces a summary; check `fetch.truncation`.
pub async fn run_pipeline(
    source: &dyn OrderSource,
    delay: &dyn Delay,
    config: &PipelineConfig,
) -> Result<PipelineResult, FetchError> {
    info!("Fetching orders processed in {}", config.year);

    let paginator =
        Paginator::new(source, delay, config.paginator.clone()).with_progress(config.show_progress);
    let fetched = paginator.fetch_all(&processed_in_year(config.year)).await?;

    if let Some(ref truncation) = fetched.report.truncation {
        warn!(
            "Summary covers a truncated order set ({} orders, {})",
            fetched.report.orders_fetched, truncation
        );
    }

    let summary = summarize(&fetched.orders, config.year, config.top_n);
    info!(
        "Aggregated {} orders, revenue {}",
        summary.total_orders, summary.total_revenue
    );

    Ok(PipelineResult {
        year: config.year,
        summary,
        fetch: fetched.report,
    })
}
