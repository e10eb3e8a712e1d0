//! The upstream seam of the fetch stage.

use crate::fetch::error::FetchError;
use crate::models::OrderRecord;
use async_trait::async_trait;

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Page size.
    pub first: u32,
    /// Continuation cursor from the previous page; `None` for the first.
    pub after: Option<String>,
    /// Upstream search filter.
    pub query: String,
}

/// One page of orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<OrderRecord>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Anything that can serve pages of orders.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch a single page. Implementations must not retry internally.
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrderPage, FetchError>;
}

/// Search filter for orders processed during `year`.
pub fn processed_in_year(year: i32) -> String {
    format!(
        "processed_at:>={}-01-01 processed_at:<{}-01-01",
        year,
        year + 1
    )
}
