// models/src/errors.rs
use std::io;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
pub use thiserror::Error;
use tokio::task::JoinError;

/// Domain error taxonomy. Every service operation surfaces one of these;
/// the caller gets a stable classification plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum EmrError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("business rule violation: {0}")]
    BusinessRule(String),
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<&str> for EmrError {
    fn from(message: &str) -> Self {
        EmrError::Internal(message.to_string())
    }
}

impl From<io::Error> for EmrError {
    fn from(err: io::Error) -> Self {
        EmrError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for EmrError {
    fn from(err: serde_json::Error) -> Self {
        EmrError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<sled::Error> for EmrError {
    fn from(err: sled::Error) -> Self {
        EmrError::Storage(format!("sled error: {}", err))
    }
}

impl From<bincode::error::EncodeError> for EmrError {
    fn from(err: bincode::error::EncodeError) -> Self {
        EmrError::Serialization(format!("bincode encode error: {}", err))
    }
}

impl From<bincode::error::DecodeError> for EmrError {
    fn from(err: bincode::error::DecodeError) -> Self {
        EmrError::Serialization(format!("bincode decode error: {}", err))
    }
}

impl From<JoinError> for EmrError {
    fn from(err: JoinError) -> Self {
        EmrError::Internal(format!("task failed to join: {}", err))
    }
}

/// Field-level validation failures. The variants carry enough detail for the
/// caller to correct the request without another round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ValidationError {
    #[error("required field '{0}' is missing or empty")]
    MissingField(String),
    #[error("field '{0}' is out of range: {1}")]
    OutOfRange(String, String),
    #[error("field '{0}' has invalid value '{1}'")]
    InvalidValue(String, String),
    #[error("field '{0}' exceeds maximum length of {1} characters")]
    TooLong(String, usize),
    #[error("invalid date in field '{0}': {1}")]
    InvalidDate(String, String),
    #[error("line item {0}: supplied total {1} does not match quantity x unit price ({2})")]
    LineTotalMismatch(usize, Decimal, Decimal),
    #[error("fixed-amount and percentage discounts are mutually exclusive")]
    ConflictingDiscounts,
    #[error("a non-zero discount requires a reason")]
    MissingDiscountReason,
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),
}

impl ValidationError {
    pub fn missing(field: &str) -> Self {
        ValidationError::MissingField(field.to_string())
    }

    pub fn out_of_range(field: &str, detail: impl Into<String>) -> Self {
        ValidationError::OutOfRange(field.to_string(), detail.into())
    }

    pub fn invalid(field: &str, value: impl Into<String>) -> Self {
        ValidationError::InvalidValue(field.to_string(), value.into())
    }
}

/// A type alias for a `Result` that returns an `EmrError` on failure.
pub type EmrResult<T> = Result<T, EmrError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_wrap_validation_error() {
        let err: EmrError = ValidationError::missing("phone").into();
        assert_eq!(
            err,
            EmrError::Validation(ValidationError::MissingField("phone".to_string()))
        );
        assert!(err.to_string().contains("phone"));
    }

    #[test]
    fn should_render_out_of_range_detail() {
        let err = ValidationError::out_of_range("heart_rate", "expected 30..=200, got 250");
        assert!(err.to_string().contains("heart_rate"));
        assert!(err.to_string().contains("250"));
    }
}
