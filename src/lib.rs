//! Bolt Sink
//!
//! A metric-relay node: accepts metric reports from agents over TCP, groups
//! them by message id, keeps a per-message outcome tally and forwards every
//! sample to a graphite-compatible backend. A single publisher connection
//! carries status traffic to the coordinating server.

pub mod aggregation;
pub mod dispatcher;
pub mod metrics;
pub mod router;
pub mod sink;
pub mod tally;
pub mod transport;

pub use aggregation::{AggregationStore, MetricBatch, MetricMessage, MetricSample};
pub use dispatcher::{DispatchReport, Dispatcher, GraphiteDispatcher};
pub use router::{MessageRouter, Routed, RouterError};
pub use sink::{Framing, MessageHandler, Sink, SinkBuilder, SinkConfig, SinkError};
pub use tally::{Outcome, OutcomeReport, OutcomeTally, TallyError};
pub use transport::{ErrorLog, Transport, TransportError};
