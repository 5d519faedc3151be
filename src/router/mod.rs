//! Message Router
//!
//! Decodes inbound payloads, validates their shape, and applies them to the
//! Aggregation Store, the Outcome Tally and the backend dispatcher.

pub mod error;
pub mod router;
pub mod types;

pub use error::{RouterError, RouterResult};
pub use router::MessageRouter;
pub use types::{InboundPayload, Routed};
