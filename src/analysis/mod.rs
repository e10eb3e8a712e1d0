//! Analysis modules.
//!
//! The aggregator builds the dashboard rollup; insights reads trends
//! off the monthly series it produces.

pub mod aggregator;
pub mod insights;

pub use aggregator::*;
pub use insights::monthly_insights;
