//! Metrics recorder for sink operations

use metrics::{counter, describe_counter, describe_gauge, gauge};
use std::sync::atomic::{AtomicBool, Ordering};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!(
        "bolt_sink_messages_accepted_total",
        "Metric messages grouped and forwarded to the backend"
    );
    describe_counter!(
        "bolt_sink_messages_erroneous_total",
        "Messages that carried an error indicator"
    );
    describe_counter!(
        "bolt_sink_messages_rejected_total",
        "Payloads that failed decoding or validation"
    );

    describe_counter!(
        "bolt_sink_backend_lines_written_total",
        "Sample lines written to the metrics backend"
    );
    describe_counter!(
        "bolt_sink_backend_lines_failed_total",
        "Sample lines the backend transport failed to write"
    );

    describe_counter!(
        "bolt_sink_connections_accepted_total",
        "Inbound agent connections accepted"
    );
    describe_gauge!(
        "bolt_sink_active_connections",
        "Agent connections currently being served"
    );

    describe_counter!(
        "bolt_sink_publisher_frames_total",
        "Frames sent to the coordinating server"
    );
    describe_counter!(
        "bolt_sink_publisher_bytes_total",
        "Bytes sent to the coordinating server"
    );
}

// ============== Message Routing ==============

pub fn record_message_accepted(host: &str) {
    counter!("bolt_sink_messages_accepted_total", "host" => host.to_string()).increment(1);
}

pub fn record_message_erroneous(host: &str) {
    counter!("bolt_sink_messages_erroneous_total", "host" => host.to_string()).increment(1);
}

pub fn record_message_rejected() {
    counter!("bolt_sink_messages_rejected_total").increment(1);
}

// ============== Backend Dispatch ==============

pub fn record_backend_lines(written: usize, failed: usize) {
    counter!("bolt_sink_backend_lines_written_total").increment(written as u64);
    if failed > 0 {
        counter!("bolt_sink_backend_lines_failed_total").increment(failed as u64);
    }
}

// ============== Connections ==============

pub fn record_connection_opened() {
    counter!("bolt_sink_connections_accepted_total").increment(1);
    gauge!("bolt_sink_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("bolt_sink_active_connections").decrement(1.0);
}

pub fn record_publisher_frame(size: usize) {
    counter!("bolt_sink_publisher_frames_total").increment(1);
    counter!("bolt_sink_publisher_bytes_total").increment(size as u64);
}
