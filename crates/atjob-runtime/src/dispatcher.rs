//! Reconcile dispatcher.
//!
//! The dispatcher is the host scheduler the reconciler assumes: it turns
//! store changes and deferred re-invocation requests into reconcile
//! invocations, guaranteeing at most one in-flight invocation per job
//! key. Triggers that arrive while a key is in flight coalesce into a
//! single follow-up run.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use atjob_api::ResourceKey;
use atjob_controller::{reconcile, Action, ReconcileContext, ReconcileError};
use atjob_store::{ObjectKind, StoreEvent};

use crate::config::DispatcherConfig;

enum Msg {
    Trigger(ResourceKey),
    Done(ResourceKey, Result<Action, ReconcileError>),
}

#[derive(Default)]
struct KeyState {
    in_flight: bool,
    rerun: bool,
    failures: u32,
}

/// Handle for injecting reconcile triggers from outside the store watch.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Msg>,
}

impl DispatcherHandle {
    /// Request a reconcile of `key`.
    pub async fn trigger(&self, key: ResourceKey) {
        if self.tx.send(Msg::Trigger(key)).await.is_err() {
            warn!("dispatcher is gone, trigger dropped");
        }
    }
}

/// Watch-driven, per-key-serialized reconcile scheduler.
pub struct Dispatcher {
    config: DispatcherConfig,
    ctx: ReconcileContext,
    tx: mpsc::Sender<Msg>,
    rx: mpsc::Receiver<Msg>,
}

impl Dispatcher {
    /// Create a dispatcher over the given collaborators.
    pub fn new(config: DispatcherConfig, ctx: ReconcileContext) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        Self {
            config,
            ctx,
            tx,
            rx,
        }
    }

    /// Get a trigger handle.
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run until the shutdown signal fires.
    ///
    /// Subscribes to the store watch: a job event triggers its own key, a
    /// workload event triggers the owning job's key (ownerless workloads
    /// are none of this controller's business).
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        let watch = self.ctx.store.watch();
        let forwarder = tokio::spawn(forward_watch_events(
            watch,
            self.tx.clone(),
            shutdown_rx.resubscribe(),
        ));

        info!("dispatcher started");
        let mut keys: HashMap<ResourceKey, KeyState> = HashMap::new();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("dispatcher shutting down");
                    break;
                }
                msg = self.rx.recv() => {
                    let Some(msg) = msg else { break };
                    match msg {
                        Msg::Trigger(key) => self.on_trigger(&mut keys, key),
                        Msg::Done(key, result) => self.on_done(&mut keys, key, result),
                    }
                }
            }
        }

        forwarder.abort();
    }

    fn on_trigger(&self, keys: &mut HashMap<ResourceKey, KeyState>, key: ResourceKey) {
        let state = keys.entry(key.clone()).or_default();
        if state.in_flight {
            // Serialized per key: remember that something changed and run
            // once more when the current invocation completes.
            state.rerun = true;
            return;
        }
        state.in_flight = true;
        self.spawn_reconcile(key);
    }

    fn on_done(
        &self,
        keys: &mut HashMap<ResourceKey, KeyState>,
        key: ResourceKey,
        result: Result<Action, ReconcileError>,
    ) {
        let state = keys.entry(key.clone()).or_default();
        state.in_flight = false;

        match result {
            Ok(action) => {
                state.failures = 0;
                if let Some(delay) = action.requeue_after() {
                    debug!(job = %key, delay_secs = delay.as_secs(), "requeue requested");
                    self.trigger_after(key.clone(), delay);
                }
            }
            Err(e) => {
                state.failures += 1;
                let delay = self.config.backoff(state.failures);
                warn!(
                    job = %key,
                    failures = state.failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "reconcile failed: {e}",
                );
                self.trigger_after(key.clone(), delay);
            }
        }

        if state.rerun {
            state.rerun = false;
            state.in_flight = true;
            self.spawn_reconcile(key);
        } else if state.failures == 0 {
            keys.remove(&key);
        }
    }

    fn spawn_reconcile(&self, key: ResourceKey) {
        let ctx = self.ctx.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = reconcile(&ctx, &key).await;
            let _ = tx.send(Msg::Done(key, result)).await;
        });
    }

    fn trigger_after(&self, key: ResourceKey, delay: std::time::Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Msg::Trigger(key)).await;
        });
    }
}

async fn forward_watch_events(
    mut watch: broadcast::Receiver<StoreEvent>,
    tx: mpsc::Sender<Msg>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = watch.recv() => match event {
                Ok(event) => {
                    let key = match event.kind {
                        ObjectKind::Job => Some(event.key),
                        ObjectKind::Workload => event.owner,
                    };
                    if let Some(key) = key {
                        if tx.send(Msg::Trigger(key)).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Reconciliation is level-based; a lost notification
                    // only delays work until the next event.
                    warn!(missed, "store watch lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
