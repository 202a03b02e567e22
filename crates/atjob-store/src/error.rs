//! Store errors.

use atjob_api::ResourceKey;
use thiserror::Error;

/// Store error types.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Object does not exist.
    #[error("Not found: {0}")]
    NotFound(ResourceKey),

    /// Object already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(ResourceKey),

    /// Write based on a stale read was rejected.
    #[error("Version conflict on {key}: write carried {written}, store has {stored}")]
    Conflict {
        key: ResourceKey,
        written: u64,
        stored: u64,
    },

    /// Owner link rejected.
    #[error("Invalid owner link: {0}")]
    InvalidOwner(String),

    /// Transient store fault.
    #[error("Store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether this error is a missing-object outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether this error is a duplicate-create outcome.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    /// Whether this error is an optimistic-concurrency violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
