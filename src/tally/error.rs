use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    #[error("No votes recorded for message: {0}")]
    UnknownMessage(String),
}

pub type TallyResult<T> = Result<T, TallyError>;
