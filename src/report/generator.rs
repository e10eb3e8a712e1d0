//! Markdown and JSON report generation.
//!
//! This module assembles the report document from a pipeline run and
//! renders it for people (Markdown) or programs (JSON).

use crate::analysis::insights::{completed_months, monthly_insights};
use crate::models::{
    AnalyticsSummary, CustomerSegment, FetchReport, Insights, Report, ReportMetadata, Trend,
    Truncation,
};
use crate::pipeline::PipelineResult;
use anyhow::Result;
use chrono::Utc;
use std::path::Path;

/// Assemble the report for a finished pipeline run.
pub fn build_report(
    result: PipelineResult,
    shop: &str,
    duration_seconds: f64,
    include_insights: bool,
) -> Report {
    let generated_at = Utc::now();
    let insights = include_insights.then(|| {
        monthly_insights(
            &result.summary.monthly_data,
            completed_months(result.year, generated_at),
        )
    });
    let recommendations = recommendations(&result.summary, &result.fetch, insights.as_ref());

    Report {
        metadata: ReportMetadata {
            shop: shop.to_string(),
            year: result.year,
            generated_at,
            fetch: result.fetch,
            duration_seconds,
        },
        summary: result.summary,
        insights,
        recommendations,
    }
}

/// Derive follow-up suggestions from the run.
pub fn recommendations(
    summary: &AnalyticsSummary,
    fetch: &FetchReport,
    insights: Option<&Insights>,
) -> Vec<String> {
    let mut recs = Vec::new();

    match fetch.truncation {
        Some(Truncation::PageCap { max_pages }) => recs.push(format!(
            "Only the newest {} pages of orders were read. Raise --max-pages for full-year totals.",
            max_pages
        )),
        Some(Truncation::UpstreamFailure { page, .. }) => recs.push(format!(
            "The API stopped responding at page {}. Figures are partial; rerun later.",
            page
        )),
        None => {}
    }

    if summary.total_orders == 0 {
        recs.push("No orders were found for this year.".to_string());
        return recs;
    }

    if let Some(insights) = insights {
        match insights.revenue_trend {
            Trend::Decreasing => recs.push(
                "Revenue over the last three months is down more than 10%. Review pricing and promotions."
                    .to_string(),
            ),
            Trend::Increasing => recs.push(
                "Revenue is trending up. Check stock levels on top sellers ahead of demand."
                    .to_string(),
            ),
            Trend::Stable => {}
        }

        for anomaly in &insights.anomalies {
            recs.push(format!(
                "{} revenue is unusually far from the yearly mean. Check for one-off events.",
                anomaly.month
            ));
        }
    }

    let segments = &summary.customer_segments;
    if segments.total() > 0 && segments.new * 2 > segments.total() {
        recs.push(
            "Most customers ordered only once. Consider a repeat-purchase campaign.".to_string(),
        );
    }

    let unfulfilled = summary.total_orders - summary.fulfilled_orders;
    if unfulfilled * 5 > summary.total_orders {
        recs.push(format!(
            "{} of {} orders are not fully fulfilled.",
            unfulfilled, summary.total_orders
        ));
    }

    recs
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!(
        "# StorePulse Report: {} ({})\n\n",
        report.metadata.shop, report.metadata.year
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_monthly_section(&report.summary));
    output.push_str(&generate_products_section(&report.summary));
    output.push_str(&generate_locations_section(&report.summary));
    output.push_str(&generate_segments_section(&report.summary));

    if let Some(ref insights) = report.insights {
        output.push_str(&generate_insights_section(insights));
    }

    output.push_str(&generate_recommendations_section(&report.recommendations));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Shop:** {}\n", metadata.shop));
    section.push_str(&format!("- **Year:** {}\n", metadata.year));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Pages Fetched:** {} (cap {})\n",
        metadata.fetch.pages_fetched, metadata.fetch.max_pages
    ));
    section.push_str(&format!(
        "- **Orders Fetched:** {}\n",
        metadata.fetch.orders_fetched
    ));
    if let Some(ref truncation) = metadata.fetch.truncation {
        section.push_str(&format!("- **Truncated:** {}\n", truncation));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Monthly Revenue](#monthly-revenue)\n");
    toc.push_str("- [Top Products](#top-products)\n");
    toc.push_str("- [Top Locations](#top-locations)\n");
    toc.push_str("- [Customer Segments](#customer-segments)\n");

    if report.insights.is_some() {
        toc.push_str("- [Insights](#insights)\n");
    }
    if !report.recommendations.is_empty() {
        toc.push_str("- [Recommendations](#recommendations)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the headline figures.
fn generate_summary_section(summary: &AnalyticsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Orders | Revenue | Avg. Order | Fulfilled | Paid |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {:.2} | {:.2} | {} | {} |\n\n",
        summary.total_orders,
        summary.total_revenue,
        summary.average_order_value,
        summary.fulfilled_orders,
        summary.paid_orders
    ));

    section
}

/// Generate the month-by-month table.
fn generate_monthly_section(summary: &AnalyticsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Revenue\n\n");
    section.push_str("| Month | Orders | Revenue |\n");
    section.push_str("|:---|:---:|---:|\n");

    for bucket in &summary.monthly_data {
        section.push_str(&format!(
            "| {} | {} | {:.2} |\n",
            bucket.month, bucket.orders, bucket.revenue
        ));
    }
    section.push('\n');

    section
}

fn generate_products_section(summary: &AnalyticsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Top Products\n\n");

    if summary.top_products.is_empty() {
        section.push_str("No products were sold in this period.\n\n");
        return section;
    }

    section.push_str("| # | Product | Units | Revenue | Line Items |\n");
    section.push_str("|:---:|:---|:---:|---:|:---:|\n");

    for (i, product) in summary.top_products.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} | {} |\n",
            i + 1,
            escape_cell(&product.title),
            product.quantity,
            product.revenue,
            product.orders
        ));
    }
    section.push('\n');

    section
}

fn generate_locations_section(summary: &AnalyticsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Top Locations\n\n");

    if summary.top_locations.is_empty() {
        section.push_str("No shipping locations in this period.\n\n");
        return section;
    }

    section.push_str("| # | City | Orders | Revenue |\n");
    section.push_str("|:---:|:---|:---:|---:|\n");

    for (i, location) in summary.top_locations.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2} |\n",
            i + 1,
            escape_cell(&location.location),
            location.orders,
            location.revenue
        ));
    }
    section.push('\n');

    section
}

fn generate_segments_section(summary: &AnalyticsSummary) -> String {
    let segments = &summary.customer_segments;
    let mut section = String::new();

    section.push_str("## Customer Segments\n\n");
    section.push_str(&format!(
        "| {} (1 order) | {} (2-4) | {} (5+) | **Total** |\n",
        CustomerSegment::New,
        CustomerSegment::Returning,
        CustomerSegment::Vip
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        segments.new,
        segments.returning,
        segments.vip,
        segments.total()
    ));

    section
}

fn generate_insights_section(insights: &Insights) -> String {
    let mut section = String::new();

    section.push_str("## Insights\n\n");

    if insights.months_observed == 0 {
        section.push_str("No completed months to analyze yet.\n\n");
        return section;
    }

    section.push_str(&format!(
        "Based on {} completed month(s).\n\n",
        insights.months_observed
    ));
    section.push_str(&format!(
        "- **Revenue Trend:** {}\n",
        insights.revenue_trend
    ));
    section.push_str(&format!(
        "- **Monthly Average:** {:.2}\n",
        insights.average
    ));
    section.push_str(&format!(
        "- **Growth (first to last month):** {:.2}%\n",
        insights.growth_rate
    ));
    if let (Some(peak), Some(trough)) = (&insights.peak, &insights.trough) {
        section.push_str(&format!(
            "- **Peak:** {} ({:.2}) | **Trough:** {} ({:.2})\n",
            peak.month, peak.revenue, trough.month, trough.revenue
        ));
    }

    if insights.anomalies.is_empty() {
        section.push_str("- **Anomalies:** none\n");
    } else {
        for anomaly in &insights.anomalies {
            section.push_str(&format!(
                "- **Anomaly:** {} revenue {:.2} ({:.2} from mean)\n",
                anomaly.month, anomaly.revenue, anomaly.deviation
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the recommendations section.
fn generate_recommendations_section(recommendations: &[String]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    for (i, rec) in recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, rec));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by StorePulse*\n".to_string()
}

/// Pipes would break the table layout.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
