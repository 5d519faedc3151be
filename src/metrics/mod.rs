//! Metrics and observability module
//!
//! Counters describing the relay's own behaviour, exposed through the
//! `metrics` facade and optionally served for Prometheus scraping.
//!
//! Key metrics exposed:
//! - Inbound messages by result (accepted, erroneous, rejected)
//! - Backend lines written and failed
//! - Accepted and live connections
//! - Publisher frames sent

pub mod exporter;
pub mod recorder;

pub use exporter::{start_metrics_server, MetricsConfig, MetricsError};
pub use recorder::{
    record_backend_lines, record_connection_closed, record_connection_opened,
    record_message_accepted, record_message_erroneous, record_message_rejected,
    record_publisher_frame,
};
