//! Data-access errors.
//!
//! Store failures are carried through unchanged; the other variants describe
//! how a repository call ended without a result.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors raised by repositories and the unit of work.
#[derive(Error, Debug)]
pub enum DataError {
    /// A required single-entity lookup found nothing to delete
    #[error("{0} not found")]
    NotFound(String),

    /// `first` was called on a predicate with zero matches
    #[error("Sequence contains no matching element")]
    EmptySequence,

    /// The caller's cancellation token fired before the store answered
    #[error("Operation was cancelled")]
    Cancelled,

    /// Whatever the underlying store reported
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DataError {
    /// Create a not found error for an entity (usually its table name)
    pub fn not_found(entity: impl Into<String>) -> Self {
        DataError::NotFound(entity.into())
    }

    /// True for the two "nothing matched" variants.
    pub fn is_missing(&self) -> bool {
        matches!(self, DataError::NotFound(_) | DataError::EmptySequence)
    }
}

/// Result type alias for data-access operations
pub type DataResult<T> = Result<T, DataError>;
