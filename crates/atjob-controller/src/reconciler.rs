//! The reconcile loop.
//!
//! One invocation is a short read-decide-write cycle: fetch the job,
//! dispatch on its phase, perform at most one status write, and return an
//! [`Action`]. The host serializes invocations per key and handles retry;
//! nothing here loops, sleeps or locks.

use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, info};

use atjob_api::{AtJob, Phase, ResourceKey};
use atjob_store::EventSeverity;

use crate::action::Action;
use crate::context::ReconcileContext;
use crate::error::ReconcileError;
use crate::schedule;
use crate::workload::workload_for_job;

const PHASE_CHANGE: &str = "PhaseChange";

/// Reconcile the job identified by `key` one step.
///
/// A missing job is a successful no-op: the user deleted it between the
/// trigger and the fetch, and the store has already cascaded to the
/// child. Phase values unknown to this version are left untouched.
pub async fn reconcile(
    ctx: &ReconcileContext,
    key: &ResourceKey,
) -> Result<Action, ReconcileError> {
    let job = match ctx.store.get_job(key).await {
        Ok(job) => job,
        Err(e) if e.is_not_found() => {
            debug!(job = %key, "job gone before fetch, nothing to do");
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e.into()),
    };

    match job.phase() {
        Phase::Pending => reconcile_pending(ctx, job).await,
        Phase::Running => reconcile_running(ctx, job).await,
        Phase::Done => {
            record_phase(ctx, &job);
            Ok(Action::await_change())
        }
        Phase::Unknown => {
            debug!(job = %key, "unrecognized phase, leaving job alone");
            Ok(Action::await_change())
        }
    }
}

/// Record the phase event for a job.
///
/// Recorded before the corresponding status write, so notifications are
/// at-least-once: an observer may see the event for a write that is
/// still being retried.
fn record_phase(ctx: &ReconcileContext, job: &AtJob) {
    ctx.recorder.record(
        &job.key(),
        EventSeverity::Normal,
        PHASE_CHANGE,
        &job.phase().to_string(),
    );
}

async fn reconcile_pending(
    ctx: &ReconcileContext,
    mut job: AtJob,
) -> Result<Action, ReconcileError> {
    record_phase(ctx, &job);

    let remaining = schedule::remaining(&job.spec.schedule)?;
    if remaining > TimeDelta::zero() {
        let delay = remaining.to_std().unwrap_or(Duration::ZERO);
        debug!(job = %job.key(), delay_secs = delay.as_secs(), "schedule not due yet");
        // Phase is unchanged, so skip the needless write.
        return Ok(Action::requeue(delay));
    }

    info!(job = %job.key(), "schedule due, advancing to Running");
    job.status.phase = Phase::Running;
    ctx.store.update_job_status(&job).await?;
    Ok(Action::await_change())
}

async fn reconcile_running(
    ctx: &ReconcileContext,
    mut job: AtJob,
) -> Result<Action, ReconcileError> {
    record_phase(ctx, &job);

    let mut desired = workload_for_job(&job);
    ctx.linker.link(&job, &mut desired)?;

    let found = match ctx.store.get_workload(&desired.key()).await {
        Ok(found) => found,
        Err(e) if e.is_not_found() => {
            match ctx.store.create_workload(&desired).await {
                Ok(created) => {
                    info!(job = %job.key(), workload = %created.key(), "workload created");
                }
                Err(e) if e.is_already_exists() => {
                    // Lost a create race; the next trigger observes it.
                    debug!(job = %job.key(), "workload appeared concurrently");
                }
                Err(e) => return Err(e.into()),
            }
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e.into()),
    };

    if found.phase().is_terminal() {
        info!(job = %job.key(), outcome = ?found.phase(), "workload finished, advancing to Done");
        job.status.phase = Phase::Done;
        ctx.store.update_job_status(&job).await?;
    } else {
        // Still active: the watch on the workload re-triggers this key
        // when its status changes, so no requeue is requested.
        debug!(job = %job.key(), "workload still active, awaiting change");
    }
    Ok(Action::await_change())
}
