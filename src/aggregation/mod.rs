//! Metric data model and the Aggregation Store
//!
//! Agents report metrics in separate packets that share a message id. The
//! store groups every accepted batch under its message id, append-only, so
//! later consumers see the full history for that id in arrival order.

pub mod store;
pub mod types;

pub use store::AggregationStore;
pub use types::{MetricBatch, MetricMessage, MetricSample};
