use recirca_model::{ModelError, RequestId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request not found: {0}")]
    NotFound(RequestId),

    #[error("transport unavailable: {0}")]
    Transport(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<ModelError> for DispatchError {
    fn from(err: ModelError) -> Self {
        DispatchError::Validation(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for DispatchError {
    fn from(err: sqlx::Error) -> Self {
        DispatchError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
