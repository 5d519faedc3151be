//! Connection Listener/Publisher
//!
//! Accepts agent connections (one task per connection), reads frames and hands
//! each one to the registered [`MessageHandler`]. Independently keeps a single
//! outbound publisher connection to the coordinating server, which is the only
//! path for status traffic leaving the sink.

pub mod config;
pub mod error;
pub mod framing;
pub mod handler;
pub mod server;

pub use config::{Framing, SinkConfig};
pub use error::{SinkError, SinkResult};
pub use framing::{encode_length_prefixed, read_frame};
pub use handler::{LoggingHandler, MessageHandler};
pub use server::{ConnectionInfo, Sink, SinkBuilder};
