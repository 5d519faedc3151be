//! Metric Backend Dispatcher
//!
//! Turns metric batches into the backend's plaintext line protocol and writes
//! them through a [`Transport`](crate::transport::Transport). Delivery is best
//! effort: each line is written once, failures are recorded and counted, and
//! the remaining lines are still attempted.

pub mod graphite;
pub mod types;

pub use graphite::GraphiteDispatcher;
pub use types::DispatchReport;

use crate::aggregation::MetricBatch;
use crate::transport::ErrorLog;
use async_trait::async_trait;

/// Backend-specific writer holding its own transport
#[async_trait]
pub trait Dispatcher: Send {
    /// Write every sample using the bare metric name
    async fn write_data(&mut self, batch: &MetricBatch) -> DispatchReport;

    /// Write every sample under `host_messageId_name`
    async fn write_namespaced(
        &mut self,
        host: &str,
        message_id: &str,
        batch: &MetricBatch,
    ) -> DispatchReport;

    /// Faults absorbed while writing
    fn error_log(&self) -> &ErrorLog;

    async fn close(&mut self);
}
