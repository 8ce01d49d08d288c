//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every operation on the learnhub data layer fails with exactly one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation before reaching storage.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Policy denial.
    ///
    /// Also returned when a row does not exist for this caller, so a denied
    /// caller cannot learn whether the row exists.
    #[error("not found")]
    Forbidden,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A data-layer invariant was violated (dangling identity, partial
    /// registration). Not recoverable by the caller.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The storage backend failed (connection, pool, protocol).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden
    }
}
