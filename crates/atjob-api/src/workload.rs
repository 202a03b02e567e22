//! The Workload resource: the ephemeral unit that executes a job's command.

use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, ResourceKey};

/// Restart behavior for a workload's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    /// Restart the container while it keeps failing.
    OnFailure,
    /// Run the container at most once.
    Never,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::OnFailure
    }
}

/// Execution phase of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadPhase {
    /// Created, not yet picked up by an executor.
    Waiting,
    /// Command is executing.
    Active,
    /// Command exited successfully.
    Succeeded,
    /// Command failed and will not be retried.
    Failed,
}

impl Default for WorkloadPhase {
    fn default() -> Self {
        WorkloadPhase::Waiting
    }
}

impl WorkloadPhase {
    /// Whether the workload has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkloadPhase::Succeeded | WorkloadPhase::Failed)
    }
}

/// A single execution container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Image to run.
    pub image: String,
    /// Command tokens; the first token is the program.
    pub command: Vec<String>,
}

/// Desired behavior of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Containers to run. This control plane always builds exactly one.
    pub containers: Vec<Container>,
    /// Restart behavior.
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

/// Observed state of a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    /// Current execution phase.
    #[serde(default)]
    pub phase: WorkloadPhase,
}

/// An ephemeral execution unit owned by an [`crate::AtJob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    /// Identity and bookkeeping.
    pub meta: ObjectMeta,
    /// Desired behavior.
    pub spec: WorkloadSpec,
    /// Observed state.
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl Workload {
    /// Create a new workload in the Waiting phase.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: WorkloadSpec,
    ) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec,
            status: WorkloadStatus::default(),
        }
    }

    /// Namespace + name key of this workload.
    pub fn key(&self) -> ResourceKey {
        self.meta.key()
    }

    /// Current phase.
    pub fn phase(&self) -> WorkloadPhase {
        self.status.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(WorkloadPhase::Succeeded.is_terminal());
        assert!(WorkloadPhase::Failed.is_terminal());
        assert!(!WorkloadPhase::Waiting.is_terminal());
        assert!(!WorkloadPhase::Active.is_terminal());
    }

    #[test]
    fn test_new_workload_is_waiting() {
        let workload = Workload::new(
            "default",
            "report-runner",
            WorkloadSpec {
                containers: vec![Container {
                    name: "runner".to_string(),
                    image: "busybox".to_string(),
                    command: vec!["noop".to_string()],
                }],
                restart_policy: RestartPolicy::default(),
            },
        );
        assert_eq!(workload.phase(), WorkloadPhase::Waiting);
        assert_eq!(workload.spec.restart_policy, RestartPolicy::OnFailure);
    }

    #[test]
    fn test_workload_serialization() {
        let workload = Workload::new(
            "default",
            "report-runner",
            WorkloadSpec {
                containers: vec![Container {
                    name: "runner".to_string(),
                    image: "busybox".to_string(),
                    command: vec!["echo".to_string(), "hi".to_string()],
                }],
                restart_policy: RestartPolicy::Never,
            },
        );
        let json = serde_json::to_string(&workload).unwrap();
        let parsed: Workload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.spec, workload.spec);
        assert_eq!(parsed.phase(), WorkloadPhase::Waiting);
    }
}
