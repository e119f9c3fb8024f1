//! Domain error model.

use thiserror::Error;

/// Result type used across the reconstruction layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is deterministic: the same snapshot always fails the same way.
/// An empty snapshot is never an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An event references an account or currency outside the requested scope.
    #[error("reference mismatch: {0}")]
    ReferenceMismatch(String),

    /// A requested date range or page is malformed.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The snapshot contradicts itself (duplicate ids, self-transfers, ...).
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested entity does not exist in the snapshot.
    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn reference_mismatch(msg: impl Into<String>) -> Self {
        Self::ReferenceMismatch(msg.into())
    }

    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::InconsistentSnapshot(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
