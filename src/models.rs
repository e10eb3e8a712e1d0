//! Data models for order analytics.
//!
//! This module contains the core data structures used throughout
//! the application: the orders consumed by the pipeline, the rollups
//! it produces, and the report document built around them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Decimal amount.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FulfillmentStatus {
    Fulfilled,
    Unfulfilled,
    Partial,
    /// Any status the pipeline does not count, kept verbatim.
    Other(String),
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FulfillmentStatus::Fulfilled => "FULFILLED",
            FulfillmentStatus::Unfulfilled => "UNFULFILLED",
            FulfillmentStatus::Partial => "PARTIALLY_FULFILLED",
            FulfillmentStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for FulfillmentStatus {
    fn from(s: &str) -> Self {
        match s {
            "FULFILLED" => FulfillmentStatus::Fulfilled,
            "UNFULFILLED" => FulfillmentStatus::Unfulfilled,
            "PARTIALLY_FULFILLED" => FulfillmentStatus::Partial,
            other => FulfillmentStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for FulfillmentStatus {
    fn from(s: String) -> Self {
        FulfillmentStatus::from(s.as_str())
    }
}

impl From<FulfillmentStatus> for String {
    fn from(status: FulfillmentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FulfillmentStatus::Fulfilled => write!(f, "Fulfilled"),
            FulfillmentStatus::Unfulfilled => write!(f, "Unfulfilled"),
            FulfillmentStatus::Partial => write!(f, "Partially fulfilled"),
            FulfillmentStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Financial status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinancialStatus {
    Paid,
    PartiallyPaid,
    Unpaid,
    /// Refunded, voided, authorized and anything unrecognized.
    Other(String),
}

impl FinancialStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FinancialStatus::Paid => "PAID",
            FinancialStatus::PartiallyPaid => "PARTIALLY_PAID",
            FinancialStatus::Unpaid => "PENDING",
            FinancialStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for FinancialStatus {
    fn from(s: &str) -> Self {
        match s {
            "PAID" => FinancialStatus::Paid,
            "PARTIALLY_PAID" => FinancialStatus::PartiallyPaid,
            "PENDING" | "UNPAID" => FinancialStatus::Unpaid,
            other => FinancialStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for FinancialStatus {
    fn from(s: String) -> Self {
        FinancialStatus::from(s.as_str())
    }
}

impl From<FinancialStatus> for String {
    fn from(status: FinancialStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FinancialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinancialStatus::Paid => write!(f, "Paid"),
            FinancialStatus::PartiallyPaid => write!(f, "Partially paid"),
            FinancialStatus::Unpaid => write!(f, "Unpaid"),
            FinancialStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A single line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier (may be absent for deleted products).
    pub product_id: Option<String>,
    /// Product title; the grouping key for product rollups.
    pub title: String,
    /// Units ordered.
    pub quantity: u64,
    /// Price of a single unit.
    pub unit_price: Decimal,
}

/// Shipping destination of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingLocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// An order as delivered by the fetch stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Upstream order identifier.
    pub id: String,
    /// When the order was created. Occasionally missing upstream.
    pub created_at: Option<DateTime<Utc>>,
    /// When the order was processed, if known.
    pub processed_at: Option<DateTime<Utc>>,
    /// Order total.
    pub total: Money,
    pub fulfillment_status: FulfillmentStatus,
    pub financial_status: FinancialStatus,
    /// Customer identifier, absent for guest checkouts.
    pub customer_id: Option<String>,
    /// Ordered line items.
    pub line_items: Vec<LineItem>,
    /// Shipping destination, absent for digital or pickup orders.
    pub shipping: Option<ShippingLocation>,
}

impl OrderRecord {
    /// Timestamp used to place the order on the calendar, if any.
    pub fn reporting_time(&self) -> Option<DateTime<Utc>> {
        self.processed_at.or(self.created_at)
    }
}

/// Orders and revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    /// Short month label ("Jan" .. "Dec").
    pub month: String,
    /// Number of orders placed in the month.
    pub orders: u64,
    /// Revenue booked in the month.
    pub revenue: Decimal,
}

/// Rollup of every line item sharing a product title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAggregate {
    pub title: String,
    pub quantity: u64,
    pub revenue: Decimal,
    /// Number of line items that touched this product.
    pub orders: u64,
}

/// Rollup of orders shipped to one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAggregate {
    /// Shipping city, or "Unknown".
    pub location: String,
    pub orders: u64,
    pub revenue: Decimal,
}

/// Customer segment by lifetime order count within the fetched set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerSegment {
    /// Exactly one order.
    New,
    /// Two to four orders.
    Returning,
    /// Five or more orders.
    Vip,
}

impl CustomerSegment {
    /// Classify a customer by order count. Zero orders has no segment.
    pub fn for_order_count(count: u64) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(CustomerSegment::New),
            2..=4 => Some(CustomerSegment::Returning),
            _ => Some(CustomerSegment::Vip),
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerSegment::New => write!(f, "New"),
            CustomerSegment::Returning => write!(f, "Returning"),
            CustomerSegment::Vip => write!(f, "VIP"),
        }
    }
}

/// Number of customers in each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerSegmentCounts {
    pub new: u64,
    pub returning: u64,
    pub vip: u64,
}

impl CustomerSegmentCounts {
    pub fn record(&mut self, segment: CustomerSegment) {
        match segment {
            CustomerSegment::New => self.new += 1,
            CustomerSegment::Returning => self.returning += 1,
            CustomerSegment::Vip => self.vip += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.new + self.returning + self.vip
    }
}

/// The dashboard rollup produced by the aggregation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    /// Revenue per order, rounded to cents; zero when there are no orders.
    pub average_order_value: Decimal,
    pub fulfilled_orders: u64,
    pub paid_orders: u64,
    /// Twelve buckets, January first.
    pub monthly_data: Vec<MonthlyBucket>,
    /// Best sellers by quantity.
    pub top_products: Vec<ProductAggregate>,
    /// Busiest shipping cities by order count.
    pub top_locations: Vec<LocationAggregate>,
    pub customer_segments: CustomerSegmentCounts,
}

/// Why a fetch returned fewer orders than upstream holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Truncation {
    /// The configured page cap was reached while more pages remained.
    PageCap { max_pages: u32 },
    /// A page could not be fetched; earlier pages were kept.
    UpstreamFailure { page: u32, reason: String },
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Truncation::PageCap { max_pages } => {
                write!(f, "page cap of {} pages reached", max_pages)
            }
            Truncation::UpstreamFailure { page, reason } => {
                write!(f, "page {} failed: {}", page, reason)
            }
        }
    }
}

/// Outcome of the fetch stage, alongside the orders themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    /// Pages successfully fetched.
    pub pages_fetched: u32,
    /// Orders successfully fetched.
    pub orders_fetched: usize,
    /// Configured page cap.
    pub max_pages: u32,
    /// Set when the dataset is incomplete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,
}

impl FetchReport {
    /// Returns true when every available order was fetched.
    pub fn complete(&self) -> bool {
        self.truncation.is_none()
    }
}

/// Direction of the monthly revenue series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "Increasing"),
            Trend::Decreasing => write!(f, "Decreasing"),
            Trend::Stable => write!(f, "Stable"),
        }
    }
}

/// Revenue of one named month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub revenue: f64,
}

/// A month whose revenue stands out from the rest of the year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAnomaly {
    pub month: String,
    pub revenue: f64,
    /// Absolute distance from the yearly mean.
    pub deviation: f64,
}

/// Observations derived from the completed months of the monthly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Completed months the figures below are based on.
    pub months_observed: usize,
    pub revenue_trend: Trend,
    /// Mean monthly revenue.
    pub average: f64,
    /// Percent change from the first to the last observed month; 0 when the
    /// first month had no revenue.
    pub growth_rate: f64,
    pub last_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak: Option<MonthlyPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trough: Option<MonthlyPoint>,
    pub anomalies: Vec<RevenueAnomaly>,
}

/// Metadata about the analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Shop the orders belong to.
    pub shop: String,
    /// Calendar year covered.
    pub year: i32,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Fetch outcome.
    pub fetch: FetchReport,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete analytics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: AnalyticsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fulfillment_status_from_str() {
        assert_eq!(FulfillmentStatus::from("FULFILLED"), FulfillmentStatus::Fulfilled);
        assert_eq!(
            FulfillmentStatus::from("PARTIALLY_FULFILLED"),
            FulfillmentStatus::Partial
        );
        // Exact match only
        assert_eq!(
            FulfillmentStatus::from("fulfilled"),
            FulfillmentStatus::Other("fulfilled".to_string())
        );
    }

    #[test]
    fn test_financial_status_from_str() {
        assert_eq!(FinancialStatus::from("PAID"), FinancialStatus::Paid);
        assert_eq!(FinancialStatus::from("PENDING"), FinancialStatus::Unpaid);
        assert_eq!(
            FinancialStatus::from("REFUNDED"),
            FinancialStatus::Other("REFUNDED".to_string())
        );
    }

    #[test]
    fn test_status_serde_keeps_raw_value() {
        let json = serde_json::to_string(&FinancialStatus::Other("VOIDED".into())).unwrap();
        assert_eq!(json, "\"VOIDED\"");

        let parsed: FulfillmentStatus = serde_json::from_str("\"UNFULFILLED\"").unwrap();
        assert_eq!(parsed, FulfillmentStatus::Unfulfilled);
    }

    #[test]
    fn test_segment_thresholds() {
        assert_eq!(CustomerSegment::for_order_count(0), None);
        assert_eq!(CustomerSegment::for_order_count(1), Some(CustomerSegment::New));
        assert_eq!(
            CustomerSegment::for_order_count(2),
            Some(CustomerSegment::Returning)
        );
        assert_eq!(
            CustomerSegment::for_order_count(4),
            Some(CustomerSegment::Returning)
        );
        assert_eq!(CustomerSegment::for_order_count(5), Some(CustomerSegment::Vip));
    }

    #[test]
    fn test_reporting_time_falls_back_to_created_at() {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let processed = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let mut order = OrderRecord {
            id: "gid://shopify/Order/1".to_string(),
            created_at: Some(created),
            processed_at: Some(processed),
            total: Money::new(Decimal::ZERO, "USD"),
            fulfillment_status: FulfillmentStatus::Fulfilled,
            financial_status: FinancialStatus::Paid,
            customer_id: None,
            line_items: vec![],
            shipping: None,
        };
        assert_eq!(order.reporting_time(), Some(processed));

        order.processed_at = None;
        assert_eq!(order.reporting_time(), Some(created));

        order.created_at = None;
        assert_eq!(order.reporting_time(), None);
    }

    #[test]
    fn test_summary_field_names() {
        let summary = AnalyticsSummary {
            total_orders: 0,
            total_revenue: Decimal::ZERO,
            average_order_value: Decimal::ZERO,
            fulfilled_orders: 0,
            paid_orders: 0,
            monthly_data: vec![],
            top_products: vec![],
            top_locations: vec![],
            customer_segments: CustomerSegmentCounts::default(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        for field in [
            "totalOrders",
            "totalRevenue",
            "averageOrderValue",
            "fulfilledOrders",
            "paidOrders",
            "monthlyData",
            "topProducts",
            "topLocations",
            "customerSegments",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_truncation_display() {
        assert_eq!(
            Truncation::PageCap { max_pages: 20 }.to_string(),
            "page cap of 20 pages reached"
        );
        let failure = Truncation::UpstreamFailure {
            page: 3,
            reason: "throttled".to_string(),
        };
        assert_eq!(failure.to_string(), "page 3 failed: throttled");
    }
}
