//! # AtJob Controller
//!
//! The reconciliation core: waits until a job's scheduled instant,
//! launches a single child workload to execute its command, and reflects
//! the workload's terminal outcome back into the job's status.
//!
//! ## Components
//!
//! - [`schedule`]: converts a schedule string into a remaining duration
//! - [`workload`]: builds the desired child workload from a job's spec
//! - [`reconciler`]: the Pending -> Running -> Done state machine
//!
//! The reconciler holds no state of its own; every invocation receives a
//! [`ReconcileContext`] carrying the store, recorder and owner-linker
//! collaborators, and returns an [`Action`] telling the host whether and
//! when to re-invoke.

pub mod action;
pub mod context;
pub mod error;
pub mod reconciler;
pub mod schedule;
pub mod workload;

pub use action::Action;
pub use context::ReconcileContext;
pub use error::ReconcileError;
pub use reconciler::reconcile;
pub use schedule::{remaining, remaining_at, ScheduleError, SCHEDULE_FORMAT};
pub use workload::{workload_for_job, workload_key, RUNNER_IMAGE, WORKLOAD_SUFFIX};
