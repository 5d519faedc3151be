use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::InvalidPayload(err.to_string())
    }
}

pub type RouterResult<T> = Result<T, RouterError>;
