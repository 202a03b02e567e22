//! Local workload executor.
//!
//! Stands in for the cluster's node agent: it claims Waiting workloads,
//! runs their single container's command as a local child process (the
//! container image is nominal here), and reports the terminal outcome
//! through the workload status channel. The claim itself is the
//! Waiting -> Active status write; optimistic concurrency makes it safe
//! for duplicate events or competing executors to race on it.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use atjob_api::{ResourceKey, RestartPolicy, Workload, WorkloadPhase};
use atjob_store::{ObjectKind, ResourceStore, StoreError};

use crate::config::ExecutorConfig;

/// Workload executor.
pub struct Executor {
    config: ExecutorConfig,
    store: Arc<dyn ResourceStore>,
}

impl Executor {
    /// Create an executor over the given store.
    pub fn new(config: ExecutorConfig, store: Arc<dyn ResourceStore>) -> Self {
        Self { config, store }
    }

    /// Run until the shutdown signal fires.
    ///
    /// Scans the configured namespace once for workloads created while
    /// no executor was running, then follows the store watch.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut watch = self.store.watch();
        info!(namespace = %self.config.namespace, "executor started");

        match self.store.list_workloads(&self.config.namespace).await {
            Ok(workloads) => {
                for workload in workloads {
                    if workload.phase() == WorkloadPhase::Waiting {
                        self.spawn_execution(workload.key());
                    }
                }
            }
            Err(e) => warn!("startup workload scan failed: {e}"),
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("executor shutting down");
                    break;
                }
                event = watch.recv() => match event {
                    Ok(event) => {
                        if event.kind == ObjectKind::Workload {
                            self.spawn_execution(event.key);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "store watch lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    fn spawn_execution(&self, key: ResourceKey) {
        let store = self.store.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            execute(store, config, key).await;
        });
    }
}

async fn execute(store: Arc<dyn ResourceStore>, config: ExecutorConfig, key: ResourceKey) {
    let workload = match store.get_workload(&key).await {
        Ok(workload) => workload,
        Err(_) => return,
    };
    if workload.phase() != WorkloadPhase::Waiting {
        return;
    }

    // Claim by moving Waiting -> Active; losing the version race means
    // someone else picked it up.
    let mut claim = workload.clone();
    claim.status.phase = WorkloadPhase::Active;
    let claimed = match store.update_workload_status(&claim).await {
        Ok(claimed) => claimed,
        Err(e) => {
            debug!(workload = %key, "claim lost: {e}");
            return;
        }
    };

    info!(workload = %key, "workload active");
    let outcome = run_to_completion(&claimed, &config).await;
    info!(workload = %key, outcome = ?outcome, "workload finished");

    report_outcome(store, &key, outcome).await;
}

async fn run_to_completion(workload: &Workload, config: &ExecutorConfig) -> WorkloadPhase {
    let Some(container) = workload.spec.containers.first() else {
        warn!(workload = %workload.key(), "no container to run");
        return WorkloadPhase::Failed;
    };

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match run_command(&container.command, config.command_timeout()).await {
            Ok(true) => return WorkloadPhase::Succeeded,
            Ok(false) | Err(_) => {
                if workload.spec.restart_policy == RestartPolicy::OnFailure
                    && attempts <= config.max_restarts
                {
                    warn!(
                        workload = %workload.key(),
                        attempt = attempts,
                        "command failed, restarting"
                    );
                    continue;
                }
                return WorkloadPhase::Failed;
            }
        }
    }
}

async fn run_command(command: &[String], limit: Option<Duration>) -> Result<bool, String> {
    let Some((program, args)) = command.split_first() else {
        return Err("empty command".to_string());
    };

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    let status = match limit {
        Some(limit) => timeout(limit, cmd.status())
            .await
            .map_err(|_| format!("timed out after {}s", limit.as_secs()))?,
        None => cmd.status().await,
    }
    .map_err(|e| e.to_string())?;

    Ok(status.success())
}

async fn report_outcome(store: Arc<dyn ResourceStore>, key: &ResourceKey, outcome: WorkloadPhase) {
    // Fresh read for the current version; the workload may have been
    // cascade-deleted while the command ran.
    let mut current = match store.get_workload(key).await {
        Ok(current) => current,
        Err(StoreError::NotFound(_)) => {
            debug!(workload = %key, "workload deleted mid-run");
            return;
        }
        Err(e) => {
            warn!(workload = %key, "outcome read failed: {e}");
            return;
        }
    };
    current.status.phase = outcome;
    if let Err(e) = store.update_workload_status(&current).await {
        warn!(workload = %key, "outcome write failed: {e}");
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
