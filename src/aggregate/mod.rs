//! Aggregate Module
//!
//! Counters, gauges and identity multisets, with Prometheus text exposition.

mod catalog;
mod exposition;
mod store;

pub use catalog::*;
pub use exposition::EXPOSITION_CONTENT_TYPE;
pub use store::{AggregateStore, Direction, ImageValue, MetricsImage};
