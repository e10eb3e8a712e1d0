//! Fetch stage: paginated order retrieval from the Admin API.
//!
//! `source` defines the one-page seam, `graphql` implements it over HTTP,
//! and `paginator` drives it with pacing, retries and the page cap.

pub mod error;
pub mod graphql;
pub mod paginator;
pub mod source;

pub use error::FetchError;
pub use graphql::{AdminApiClient, ApiClientConfig};
pub use paginator::{Delay, FetchedOrders, Paginator, PaginatorConfig, TokioDelay, WaitReason};
pub use source::{processed_in_year, OrderPage, OrderSource, PageRequest};
