//! # AtJob API
//!
//! Resource model for the atjob control plane.
//!
//! ## Resources
//!
//! - [`AtJob`]: user-defined resource describing one scheduled execution
//!   and its command
//! - [`Workload`]: the ephemeral unit launched to run a job's command
//! - [`ObjectMeta`] / [`ResourceKey`]: identity and bookkeeping shared by
//!   both resource kinds

pub mod job;
pub mod meta;
pub mod workload;

pub use job::{AtJob, JobSpec, JobStatus, Phase};
pub use meta::{ObjectMeta, OwnerRef, ResourceKey};
pub use workload::{Container, RestartPolicy, Workload, WorkloadPhase, WorkloadSpec, WorkloadStatus};
