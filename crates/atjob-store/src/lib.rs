//! # AtJob Store
//!
//! Collaborators consumed by the reconciler:
//!
//! - [`ResourceStore`]: object storage with optimistic concurrency, a
//!   status-only write channel, watch notification, and owner-cascade
//!   deletion. [`MemoryStore`] is the in-process implementation.
//! - [`EventRecorder`]: fire-and-forget notification sink
//!   ([`LogRecorder`] for production, [`MemoryRecorder`] for tests).
//! - [`OwnerLinker`]: establishes the cascading-delete relationship
//!   between a job and its workload ([`RefLinker`]).

pub mod error;
pub mod events;
pub mod owner;
pub mod store;

pub use error::StoreError;
pub use events::{EventRecord, EventRecorder, EventSeverity, LogRecorder, MemoryRecorder};
pub use owner::{OwnerLinker, RefLinker, OWNER_KIND};
pub use store::{MemoryStore, ObjectKind, ResourceStore, StoreEvent};
