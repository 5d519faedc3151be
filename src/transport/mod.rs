//! Transport Base
//!
//! Minimal output endpoints used by the backend dispatchers: a TCP stream, a
//! connected UDP socket and an append-mode file. Faults are recorded into a
//! shared [`ErrorLog`] and returned as a failed result; they never panic or
//! unwind across tasks.

pub mod error;
pub mod file;
pub mod stream;
pub mod types;

pub use error::{TransportError, TransportResult};
pub use file::FileTransport;
pub use stream::{DatagramTransport, StreamTransport};
pub use types::ErrorLog;

use async_trait::async_trait;

/// Capability interface implemented by every concrete transport.
///
/// `close` is idempotent and safe to call on a transport that was never
/// connected.
#[async_trait]
pub trait Transport: Send {
    /// Establish the endpoint this transport was created for.
    async fn connect(&mut self) -> TransportResult<()>;

    /// Write the whole buffer, or fail with [`TransportError::NoEndpoint`]
    /// (or [`TransportError::NoFileHandle`]) when nothing is open.
    async fn write(&mut self, bytes: &[u8]) -> TransportResult<()>;

    /// Release the underlying handle, if any.
    async fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// Log of faults absorbed by this transport.
    fn error_log(&self) -> &ErrorLog;
}
