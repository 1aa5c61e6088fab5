use thiserror::Error;

use crate::db::StoreError;

/// Errors returned by the attendance and task engines.
///
/// `Validation` is always user-facing (the HTTP layer maps it to a 400),
/// `NotFound` to a 404, and `Transient` signals the caller may retry the
/// whole operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("temporarily unavailable: {0}")]
    Transient(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound(what.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => CoreError::Validation(format!("{what} already exists")),
            StoreError::NotFound(what) => CoreError::NotFound(what),
            StoreError::Unavailable(msg) => CoreError::Transient(msg),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
