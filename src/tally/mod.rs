pub mod error;
pub mod outcome;
pub mod types;

pub use error::{TallyError, TallyResult};
pub use outcome::OutcomeTally;
pub use types::{Outcome, OutcomeReport};
