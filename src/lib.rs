//! StorePulse: order analytics for storefront merchants.
//!
//! Fetches a calendar year of orders from the GraphQL Admin API and rolls
//! them up into monthly revenue, best sellers, shipping cities and customer
//! segments.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod report;

pub use pipeline::{run_pipeline, PipelineConfig, PipelineResult};
