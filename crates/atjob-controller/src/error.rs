//! Reconciler errors.

use thiserror::Error;

use atjob_store::StoreError;

use crate::schedule::ScheduleError;

/// Errors surfaced from a reconcile invocation.
///
/// Both variants cause the host to retry the key with backoff. A
/// [`ReconcileError::Schedule`] will not self-resolve: retries keep
/// failing until a user edits the job's spec.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed schedule string.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
