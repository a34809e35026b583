//! Unified error handling.
//!
//! Every operation exposed to the façade resolves to one of the three
//! kinds described in spec.md §7: `Success` (not an error), `Invalid`
//! (caller-fixable business rule violation), or `Error` (system fault).
//! `NotFound` is an internal fourth kind used by the store adapter
//! (spec.md §4.B's `ErrRecordNotFound`) that services fold into either
//! `Invalid` or `Error` depending on context.

use thiserror::Error;

/// The error type returned by every service operation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business rule violation. Caller-fixable. Maps to HTTP 400.
    #[error("{0}")]
    Invalid(String),

    /// System fault: store/broker/cache transport error, serialization
    /// failure, panic recovery. Not caller-fixable. Maps to HTTP 500.
    #[error("{0}")]
    System(String),

    /// A row was not found where the caller expected one. Internal only —
    /// services convert this into `Invalid` or `System` depending on
    /// whether "missing" is a normal business outcome for that operation.
    #[error("record not found")]
    NotFound,
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::Invalid(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        AppError::System(msg.into())
    }

    /// HTTP status-like code used by the façade's response envelope.
    pub fn code(&self) -> u16 {
        match self {
            AppError::Invalid(_) => 400,
            AppError::System(_) => 500,
            AppError::NotFound => 500,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::System(format!("store error: {other}")),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::System(format!("cache error: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::System(format!("serialization error: {err}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_maps_to_400() {
        assert_eq!(AppError::invalid("bad input").code(), 400);
    }

    #[test]
    fn system_maps_to_500() {
        assert_eq!(AppError::system("boom").code(), 500);
    }

    #[test]
    fn row_not_found_converts() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound));
    }
}
