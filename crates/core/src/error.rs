//! Errors raised by stock history rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures of domain logic.
///
/// Database and transport failures have their own error types in the
/// infrastructure crate; nothing here depends on IO.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before any state changed (bad filter, bad setting value).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record would break a rule that must always hold (negative quantity,
    /// mixed currencies in one sum).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A host primary key did not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
