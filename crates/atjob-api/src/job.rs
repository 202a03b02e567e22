//! The AtJob resource: one scheduled execution of a command.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, ResourceKey};

/// Lifecycle phase of a job.
///
/// Phases only ever move forward: Pending -> Running -> Done. An empty
/// phase string decodes to [`Phase::Pending`]; any unrecognized value
/// decodes to [`Phase::Unknown`], which reconciliation leaves untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    /// Waiting for the scheduled instant.
    Pending,
    /// Child workload launched.
    Running,
    /// Child workload reached a terminal state.
    Done,
    /// Phase value not known to this version.
    Unknown,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Pending
    }
}

impl From<String> for Phase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "Pending" => Phase::Pending,
            "Running" => Phase::Running,
            "Done" => Phase::Done,
            _ => Phase::Unknown,
        }
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.to_string()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Done => "Done",
            Phase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Desired behavior of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Scheduled UTC instant, fixed format `YYYY-MM-DDTHH:MM:SSZ`.
    pub schedule: String,
    /// Command line, whitespace-delimited tokens (no quoting support).
    pub command: String,
}

/// Observed state of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Current lifecycle phase.
    #[serde(default)]
    pub phase: Phase,
}

/// A one-shot scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtJob {
    /// Identity and bookkeeping.
    pub meta: ObjectMeta,
    /// Desired behavior.
    pub spec: JobSpec,
    /// Observed state.
    #[serde(default)]
    pub status: JobStatus,
}

impl AtJob {
    /// Create a new job in the default (Pending) phase.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: JobSpec) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec,
            status: JobStatus::default(),
        }
    }

    /// Namespace + name key of this job.
    pub fn key(&self) -> ResourceKey {
        self.meta.key()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.status.phase
    }
}
