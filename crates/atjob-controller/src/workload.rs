//! Desired child workload construction.

use atjob_api::{AtJob, Container, ResourceKey, RestartPolicy, Workload, WorkloadSpec};

/// Fixed suffix appended to the job name to derive the workload name.
pub const WORKLOAD_SUFFIX: &str = "-runner";

/// Image run by the workload's single container.
pub const RUNNER_IMAGE: &str = "busybox";

/// Key of the workload owned by `job`.
pub fn workload_key(job: &AtJob) -> ResourceKey {
    ResourceKey::new(
        job.meta.namespace.clone(),
        format!("{}{}", job.meta.name, WORKLOAD_SUFFIX),
    )
}

/// Build the desired child workload for a job.
///
/// Pure and deterministic: the same job spec always yields the same
/// descriptor. The command is split on whitespace with no quoting or
/// escaping, so arguments with embedded whitespace cannot be expressed;
/// this is a known limitation of the command format.
pub fn workload_for_job(job: &AtJob) -> Workload {
    let key = workload_key(job);
    let command: Vec<String> = job
        .spec
        .command
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut workload = Workload::new(
        key.namespace,
        key.name,
        WorkloadSpec {
            containers: vec![Container {
                name: RUNNER_IMAGE.to_string(),
                image: RUNNER_IMAGE.to_string(),
                command,
            }],
            restart_policy: RestartPolicy::OnFailure,
        },
    );
    workload
        .meta
        .labels
        .insert("app".to_string(), job.meta.name.clone());
    workload
}
