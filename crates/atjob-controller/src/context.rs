//! Per-invocation collaborator context.

use std::sync::Arc;

use atjob_store::{EventRecorder, OwnerLinker, ResourceStore};

/// Collaborators handed to every reconcile invocation.
///
/// Carrying these explicitly (rather than as shared mutable fields of the
/// reconciler) keeps invocations isolated and lets tests substitute the
/// in-memory implementations.
#[derive(Clone)]
pub struct ReconcileContext {
    /// Object storage.
    pub store: Arc<dyn ResourceStore>,
    /// Notification sink.
    pub recorder: Arc<dyn EventRecorder>,
    /// Cascading-delete linkage.
    pub linker: Arc<dyn OwnerLinker>,
}

impl ReconcileContext {
    /// Bundle the three collaborators.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        recorder: Arc<dyn EventRecorder>,
        linker: Arc<dyn OwnerLinker>,
    ) -> Self {
        Self {
            store,
            recorder,
            linker,
        }
    }
}
