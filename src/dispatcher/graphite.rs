//! Graphite plaintext protocol dispatcher

use crate::aggregation::{MetricBatch, MetricSample};
use crate::dispatcher::types::DispatchReport;
use crate::dispatcher::Dispatcher;
use crate::metrics::record_backend_lines;
use crate::transport::{ErrorLog, StreamTransport, Transport};
use async_trait::async_trait;

/// Writes `"<name> <value> <timestamp>\n"`, one transport write per sample
pub struct GraphiteDispatcher<T: Transport = StreamTransport> {
    transport: T,
}

impl GraphiteDispatcher<StreamTransport> {
    /// Dispatcher over a TCP connection to `host:port`
    pub async fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::connect(StreamTransport::new(host, port)).await
    }
}

impl<T: Transport> GraphiteDispatcher<T> {
    /// Wrap an already prepared transport without connecting it
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Connect the transport; a failure is recorded and the dispatcher is
    /// still returned, so later writes fail (and are logged) individually.
    pub async fn connect(mut transport: T) -> Self {
        if transport.connect().await.is_err() {
            transport
                .error_log()
                .record("Error establishing a connection to graphite backend");
        }
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Render a single plaintext protocol line
    pub fn format_line(name: &str, sample: &MetricSample) -> String {
        format!("{} {} {}\n", name, sample.value, sample.timestamp)
    }

    async fn emit(&mut self, prefix: Option<String>, batch: &MetricBatch) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (name, samples) in batch.iter() {
            let metric_name = match &prefix {
                Some(prefix) => format!("{}_{}", prefix, name),
                None => name.to_string(),
            };

            for sample in samples {
                let line = Self::format_line(&metric_name, sample);
                match self.transport.write(line.as_bytes()).await {
                    Ok(()) => report.lines_written += 1,
                    Err(_) => report.lines_failed += 1,
                }
            }
        }

        record_backend_lines(report.lines_written, report.lines_failed);
        if !report.is_complete() {
            tracing::warn!(%report, "graphite dispatch incomplete");
        }

        report
    }
}

#[async_trait]
impl<T: Transport> Dispatcher for GraphiteDispatcher<T> {
    async fn write_data(&mut self, batch: &MetricBatch) -> DispatchReport {
        self.emit(None, batch).await
    }

    async fn write_namespaced(
        &mut self,
        host: &str,
        message_id: &str,
        batch: &MetricBatch,
    ) -> DispatchReport {
        self.emit(Some(format!("{}_{}", host, message_id)), batch)
            .await
    }

    fn error_log(&self) -> &ErrorLog {
        self.transport.error_log()
    }

    async fn close(&mut self) {
        self.transport.close().await;
    }
}
