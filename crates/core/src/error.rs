//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger domain.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Only deterministic business failures live here. A rejected operation never
/// changes the ledger, so callers can report the error and keep their snapshot.
/// Storage and presentation failures have their own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller input was rejected (non-positive amount, empty name, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation would break a ledger invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced borrower, loan or transaction does not exist.
    ///
    /// Engine operations treat stale references as no-ops; this variant is for
    /// callers that want to surface the condition.
    #[error("not found")]
    NotFound,
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

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Whether the error was caused by caller input rather than ledger state.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidId(_))
    }
}
