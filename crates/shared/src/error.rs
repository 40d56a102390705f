use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Load,
}

/// Failure to obtain a collection from its remote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
    #[error("request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("unexpected payload from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no record with id {id}")]
pub struct NotFoundError {
    pub id: i64,
}

/// Required-field and state checks performed before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("invalid value '{value}' for '{field}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("record {id} is already {state}")]
    AlreadyInState { id: i64, state: &'static str },
    #[error("no {what} to export")]
    Empty { what: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("session is not authenticated")]
    Unauthenticated,
}

impl ListError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ListError::NotFound(_) => ErrorCode::NotFound,
            ListError::Validation(_) => ErrorCode::Validation,
            ListError::Load(_) => ErrorCode::Load,
            ListError::Unauthenticated => ErrorCode::Unauthorized,
        }
    }
}

/// Requires a non-blank text field.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}
