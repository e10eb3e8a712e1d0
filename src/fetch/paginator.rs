//! Cursor-driven pagination with pacing and bounded retries.
//!
//! Pages are requested strictly one at a time. Before the first attempt of
//! every page after the first, the paginator waits a fixed pacing delay.
//! Transient failures are retried with linear backoff. Once at least one
//! page has arrived, later failures end the fetch early instead of failing it.

use crate::fetch::error::FetchError;
use crate::fetch::source::{OrderPage, OrderSource, PageRequest};
use crate::models::{FetchReport, OrderRecord, Truncation};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runtime settings for the paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatorConfig {
    /// Orders per request.
    pub page_size: u32,
    /// Hard cap on pages per run.
    pub max_pages: u32,
    /// Pause before each page after the first.
    pub request_delay: Duration,
    /// Additional attempts per page for transient failures.
    pub max_retries: u32,
    /// Backoff unit after a throttle.
    pub throttle_backoff: Duration,
    /// Backoff unit after a network failure.
    pub network_backoff: Duration,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            page_size: 250,
            max_pages: 20,
            request_delay: Duration::from_millis(1500),
            max_retries: 3,
            throttle_backoff: Duration::from_millis(4000),
            network_backoff: Duration::from_millis(3000),
        }
    }
}

impl From<&crate::config::FetchConfig> for PaginatorConfig {
    fn from(config: &crate::config::FetchConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages: config.max_pages,
            request_delay: Duration::from_millis(config.request_delay_ms),
            max_retries: config.max_retries,
            throttle_backoff: Duration::from_millis(config.throttle_backoff_ms),
            network_backoff: Duration::from_millis(config.network_backoff_ms),
        }
    }
}

impl PaginatorConfig {
    /// Linear backoff: unit for the failure class times the attempt number.
    pub fn backoff_for(&self, error: &FetchError, attempt: u32) -> Duration {
        let unit = match error {
            FetchError::Throttled(_) => self.throttle_backoff,
            _ => self.network_backoff,
        };
        unit * attempt
    }
}

/// Why the paginator is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Fixed pause before the first attempt of `page`.
    Pacing { page: u32 },
    /// Backoff before retry `attempt` of `page`.
    Backoff { page: u32, attempt: u32 },
}

/// Something that can suspend the fetch for a while.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration, reason: WaitReason);
}

/// Real delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration, _reason: WaitReason) {
        tokio::time::sleep(duration).await;
    }
}

/// Orders collected by a fetch plus how the fetch ended.
#[derive(Debug, Clone)]
pub struct FetchedOrders {
    pub orders: Vec<OrderRecord>,
    pub report: FetchReport,
}

/// Walks the upstream order list page by page.
pub struct Paginator<'a> {
    source: &'a dyn OrderSource,
    delay: &'a dyn Delay,
    config: PaginatorConfig,
    progress: Option<ProgressBar>,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn OrderSource, delay: &'a dyn Delay, config: PaginatorConfig) -> Self {
        Self {
            source,
            delay,
            config,
            progress: None,
        }
    }

    /// Show a spinner with page progress on stderr.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.progress = show.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        self
    }

    /// Fetch every page matching `query`, up to the page cap.
    ///
    /// Fails only when the first page cannot be fetched. Any later failure
    /// returns the pages collected so far with the truncation recorded.
    pub async fn fetch_all(&self, query: &str) -> Result<FetchedOrders, FetchError> {
        let mut orders = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages_fetched: u32 = 0;

        let truncation = loop {
            if pages_fetched >= self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    orders = orders.len(),
                    "Page cap reached, remaining orders not fetched"
                );
                break Some(Truncation::PageCap {
                    max_pages: self.config.max_pages,
                });
            }

            let page_number = pages_fetched + 1;
            if page_number > 1 {
                self.delay
                    .wait(
                        self.config.request_delay,
                        WaitReason::Pacing { page: page_number },
                    )
                    .await;
            }

            let request = PageRequest {
                first: self.config.page_size,
                after: cursor.clone(),
                query: query.to_string(),
            };

            let page = match self.fetch_page_with_retry(&request, page_number).await {
                Ok(page) => page,
                Err(e) if pages_fetched == 0 => {
                    error!("First page could not be fetched: {}", e);
                    self.finish_progress("Fetch failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        page = page_number,
                        reason = %e,
                        orders = orders.len(),
                        "Order fetch truncated after upstream failure"
                    );
                    break Some(Truncation::UpstreamFailure {
                        page: page_number,
                        reason: e.to_string(),
                    });
                }
            };

            pages_fetched += 1;
            let OrderPage {
                orders: page_orders,
                has_next_page,
                end_cursor,
            } = page;
            debug!(
                "Page {} returned {} orders (has_next_page={})",
                page_number,
                page_orders.len(),
                has_next_page
            );
            orders.extend(page_orders);

            if let Some(ref pb) = self.progress {
                pb.set_message(format!(
                    "Fetched {} pages ({} orders)",
                    pages_fetched,
                    orders.len()
                ));
            }

            if !has_next_page {
                break None;
            }

            match end_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    warn!(
                        page = page_number + 1,
                        "Upstream reported more pages without a cursor, stopping"
                    );
                    break Some(Truncation::UpstreamFailure {
                        page: page_number + 1,
                        reason: "missing end cursor".to_string(),
                    });
                }
            }
        };

        info!(
            "Fetched {} orders across {} pages{}",
            orders.len(),
            pages_fetched,
            if truncation.is_some() { " (truncated)" } else { "" }
        );
        self.finish_progress(&format!("Fetched {} orders", orders.len()));

        let report = FetchReport {
            pages_fetched,
            orders_fetched: orders.len(),
            max_pages: self.config.max_pages,
            truncation,
        };

        Ok(FetchedOrders { orders, report })
    }

    /// Request one page, retrying transient failures with linear backoff.
    async fn fetch_page_with_retry(
        &self,
        request: &PageRequest,
        page: u32,
    ) -> Result<OrderPage, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            match self.source.fetch_page(request).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let wait = self.config.backoff_for(&e, attempt);
                    warn!(
                        "Page {} failed ({}), retry {}/{} in {:.1}s",
                        page,
                        e,
                        attempt,
                        self.config.max_retries,
                        wait.as_secs_f64()
                    );
                    self.delay
                        .wait(wait, WaitReason::Backoff { page, attempt })
                        .await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!("Page {} failed after {} retries: {}", page, attempt, e);
                    } else {
                        warn!("Page {} failed with non-retryable error: {}", page, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    fn finish_progress(&self, message: &str) {
        if let Some(ref pb) = self.progress {
            pb.finish_with_message(message.to_string());
        }
    }
}
