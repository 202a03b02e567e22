use super::*;
use std::future::Future;

use tokio::time::sleep;

use atjob_api::{Container, WorkloadSpec};
use atjob_store::MemoryStore;
use tempfile::TempDir;

fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        namespace: "default".to_string(),
        max_restarts: 2,
        command_timeout_secs: Some(5),
    }
}

fn workload(name: &str, command: &[&str], restart_policy: RestartPolicy) -> Workload {
    Workload::new(
        "default",
        name,
        WorkloadSpec {
            containers: vec![Container {
                name: "runner".to_string(),
                image: "busybox".to_string(),
                command: command.iter().map(|s| s.to_string()).collect(),
            }],
            restart_policy,
        },
    )
}

struct Rig {
    store: Arc<MemoryStore>,
    shutdown_tx: broadcast::Sender<()>,
    executor: tokio::task::JoinHandle<()>,
}

fn rig_with(store: Arc<MemoryStore>) -> Rig {
    let executor = Executor::new(fast_config(), store.clone());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let executor = tokio::spawn(executor.run(shutdown_rx));
    Rig {
        store,
        shutdown_tx,
        executor,
    }
}

fn rig() -> Rig {
    rig_with(Arc::new(MemoryStore::new()))
}

impl Rig {
    async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        tokio::time::timeout(Duration::from_secs(1), self.executor)
            .await
            .expect("executor did not stop")
            .unwrap();
    }
}

async fn wait_for<F, Fut>(what: &str, mut probe: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if probe().await {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn wait_phase(store: Arc<dyn ResourceStore>, key: ResourceKey, phase: WorkloadPhase) {
    wait_for("workload phase", || {
        let store = store.clone();
        let key = key.clone();
        async move { store.get_workload(&key).await.unwrap().phase() == phase }
    })
    .await;
}

#[tokio::test]
async fn test_successful_command_reports_succeeded() {
    let rig = rig();

    let created = rig
        .store
        .create_workload(&workload("ok-runner", &["true"], RestartPolicy::Never))
        .await
        .unwrap();

    wait_phase(rig.store.clone(), created.key(), WorkloadPhase::Succeeded).await;
    rig.shutdown().await;
}

#[tokio::test]
async fn test_failing_command_reports_failed() {
    let rig = rig();

    let created = rig
        .store
        .create_workload(&workload("bad-runner", &["false"], RestartPolicy::Never))
        .await
        .unwrap();

    wait_phase(rig.store.clone(), created.key(), WorkloadPhase::Failed).await;
    rig.shutdown().await;
}

#[tokio::test]
async fn test_on_failure_restarts_before_giving_up() {
    let rig = rig();
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("attempts");

    // One token may contain spaces when built directly; the naive split
    // only applies to job specs.
    let script = format!("echo x >> {} && exit 1", marker.display());
    let created = rig
        .store
        .create_workload(&workload(
            "retry-runner",
            &["sh", "-c", &script],
            RestartPolicy::OnFailure,
        ))
        .await
        .unwrap();

    wait_phase(rig.store.clone(), created.key(), WorkloadPhase::Failed).await;

    // First attempt plus max_restarts retries.
    let attempts = std::fs::read_to_string(&marker).unwrap().lines().count();
    assert_eq!(attempts, 3);
    rig.shutdown().await;
}

#[tokio::test]
async fn test_startup_scan_picks_up_existing_workloads() {
    let store = Arc::new(MemoryStore::new());
    let created = store
        .create_workload(&workload("early-runner", &["true"], RestartPolicy::Never))
        .await
        .unwrap();

    // The workload predates the executor; only the scan can find it.
    let rig = rig_with(store);
    wait_phase(rig.store.clone(), created.key(), WorkloadPhase::Succeeded).await;
    rig.shutdown().await;
}

#[tokio::test]
async fn test_empty_command_fails_without_spawning() {
    let rig = rig();

    let created = rig
        .store
        .create_workload(&workload("void-runner", &[], RestartPolicy::OnFailure))
        .await
        .unwrap();

    wait_phase(rig.store.clone(), created.key(), WorkloadPhase::Failed).await;
    rig.shutdown().await;
}

#[tokio::test]
async fn test_unknown_program_fails() {
    let rig = rig();

    let created = rig
        .store
        .create_workload(&workload(
            "missing-runner",
            &["definitely-not-a-real-binary"],
            RestartPolicy::Never,
        ))
        .await
        .unwrap();

    wait_phase(rig.store.clone(), created.key(), WorkloadPhase::Failed).await;
    rig.shutdown().await;
}
