//! Versioned in-memory resource store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use atjob_api::{AtJob, ResourceKey, Workload};

use crate::error::StoreError;

/// Kind of object a store event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// An [`AtJob`].
    Job,
    /// A [`Workload`].
    Workload,
}

/// Change notification emitted after every successful write.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Kind of the changed object.
    pub kind: ObjectKind,
    /// Key of the changed object.
    pub key: ResourceKey,
    /// Owning job key, for workload events carrying an owner reference.
    pub owner: Option<ResourceKey>,
}

/// Object storage consumed by the reconciler and the host runtime.
///
/// Status is a separate write channel from spec: [`update_job`] never
/// touches stored status and [`update_job_status`] never touches stored
/// spec. Every write is a single atomic object replacement guarded by
/// optimistic concurrency: it must carry the `resource_version` it read,
/// and a mismatch fails with [`StoreError::Conflict`].
///
/// [`update_job`]: ResourceStore::update_job
/// [`update_job_status`]: ResourceStore::update_job_status
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a job by key.
    async fn get_job(&self, key: &ResourceKey) -> Result<AtJob, StoreError>;

    /// Create a job. Returns the stored copy with its assigned version.
    async fn create_job(&self, job: &AtJob) -> Result<AtJob, StoreError>;

    /// Replace a job's spec and labels.
    async fn update_job(&self, job: &AtJob) -> Result<AtJob, StoreError>;

    /// Replace a job's status.
    async fn update_job_status(&self, job: &AtJob) -> Result<AtJob, StoreError>;

    /// Delete a job, cascading to every workload it owns.
    async fn delete_job(&self, key: &ResourceKey) -> Result<(), StoreError>;

    /// Fetch a workload by key.
    async fn get_workload(&self, key: &ResourceKey) -> Result<Workload, StoreError>;

    /// Create a workload. Returns the stored copy with its assigned version.
    async fn create_workload(&self, workload: &Workload) -> Result<Workload, StoreError>;

    /// Replace a workload's status.
    async fn update_workload_status(&self, workload: &Workload) -> Result<Workload, StoreError>;

    /// List all workloads in a namespace.
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, StoreError>;

    /// Subscribe to change notifications.
    fn watch(&self) -> broadcast::Receiver<StoreEvent>;
}

struct Inner {
    jobs: HashMap<ResourceKey, AtJob>,
    workloads: HashMap<ResourceKey, Workload>,
    version: u64,
}

impl Inner {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// In-memory [`ResourceStore`] implementation.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            inner: RwLock::new(Inner {
                jobs: HashMap::new(),
                workloads: HashMap::new(),
                version: 0,
            }),
            events,
        }
    }

    fn notify(&self, kind: ObjectKind, key: ResourceKey, owner: Option<ResourceKey>) {
        // No receivers is fine; notification is best-effort.
        let _ = self.events.send(StoreEvent { kind, key, owner });
    }

    fn check_version(key: &ResourceKey, written: u64, stored: u64) -> Result<(), StoreError> {
        if written != stored {
            return Err(StoreError::Conflict {
                key: key.clone(),
                written,
                stored,
            });
        }
        Ok(())
    }

    fn workload_owner(workload: &Workload) -> Option<ResourceKey> {
        workload
            .meta
            .owner_ref
            .as_ref()
            .map(|o| ResourceKey::new(workload.meta.namespace.clone(), o.name.clone()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_job(&self, key: &ResourceKey) -> Result<AtJob, StoreError> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn create_job(&self, job: &AtJob) -> Result<AtJob, StoreError> {
        let key = job.key();
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        let mut stored = job.clone();
        stored.meta.resource_version = inner.next_version();
        inner.jobs.insert(key.clone(), stored.clone());
        drop(inner);

        debug!(job = %key, version = stored.meta.resource_version, "job created");
        self.notify(ObjectKind::Job, key, None);
        Ok(stored)
    }

    async fn update_job(&self, job: &AtJob) -> Result<AtJob, StoreError> {
        let key = job.key();
        let mut inner = self.inner.write().await;
        let version = inner.next_version();
        let stored = inner
            .jobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        Self::check_version(&key, job.meta.resource_version, stored.meta.resource_version)?;

        stored.spec = job.spec.clone();
        stored.meta.labels = job.meta.labels.clone();
        stored.meta.resource_version = version;
        let updated = stored.clone();
        drop(inner);

        debug!(job = %key, version, "job spec updated");
        self.notify(ObjectKind::Job, key, None);
        Ok(updated)
    }

    async fn update_job_status(&self, job: &AtJob) -> Result<AtJob, StoreError> {
        let key = job.key();
        let mut inner = self.inner.write().await;
        let version = inner.next_version();
        let stored = inner
            .jobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        Self::check_version(&key, job.meta.resource_version, stored.meta.resource_version)?;

        stored.status = job.status.clone();
        stored.meta.resource_version = version;
        let updated = stored.clone();
        drop(inner);

        debug!(job = %key, version, phase = %updated.phase(), "job status updated");
        self.notify(ObjectKind::Job, key, None);
        Ok(updated)
    }

    async fn delete_job(&self, key: &ResourceKey) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        // Cascade: collect dependents owned by this job's uid.
        let owned: Vec<ResourceKey> = inner
            .workloads
            .values()
            .filter(|w| {
                w.meta.namespace == key.namespace
                    && w.meta
                        .owner_ref
                        .as_ref()
                        .is_some_and(|o| o.uid == job.meta.uid)
            })
            .map(Workload::key)
            .collect();
        for workload_key in &owned {
            inner.workloads.remove(workload_key);
        }
        drop(inner);

        debug!(job = %key, cascaded = owned.len(), "job deleted");
        for workload_key in owned {
            self.notify(ObjectKind::Workload, workload_key, Some(key.clone()));
        }
        self.notify(ObjectKind::Job, key.clone(), None);
        Ok(())
    }

    async fn get_workload(&self, key: &ResourceKey) -> Result<Workload, StoreError> {
        let inner = self.inner.read().await;
        inner
            .workloads
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn create_workload(&self, workload: &Workload) -> Result<Workload, StoreError> {
        let key = workload.key();
        let mut inner = self.inner.write().await;
        if inner.workloads.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        let mut stored = workload.clone();
        stored.meta.resource_version = inner.next_version();
        inner.workloads.insert(key.clone(), stored.clone());
        drop(inner);

        debug!(workload = %key, version = stored.meta.resource_version, "workload created");
        self.notify(ObjectKind::Workload, key, Self::workload_owner(&stored));
        Ok(stored)
    }

    async fn update_workload_status(&self, workload: &Workload) -> Result<Workload, StoreError> {
        let key = workload.key();
        let mut inner = self.inner.write().await;
        let version = inner.next_version();
        let stored = inner
            .workloads
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        Self::check_version(
            &key,
            workload.meta.resource_version,
            stored.meta.resource_version,
        )?;

        stored.status = workload.status.clone();
        stored.meta.resource_version = version;
        let updated = stored.clone();
        drop(inner);

        debug!(workload = %key, version, "workload status updated");
        self.notify(ObjectKind::Workload, key, Self::workload_owner(&updated));
        Ok(updated)
    }

    async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .workloads
            .values()
            .filter(|w| w.meta.namespace == namespace)
            .cloned()
            .collect())
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::{OwnerLinker, RefLinker};
    use atjob_api::{Container, JobSpec, Phase, RestartPolicy, WorkloadSpec};

    fn job(name: &str) -> AtJob {
        AtJob::new(
            "default",
            name,
            JobSpec {
                schedule: "2030-01-01T00:00:00Z".to_string(),
                command: "noop".to_string(),
            },
        )
    }

    fn workload(name: &str) -> Workload {
        Workload::new(
            "default",
            name,
            WorkloadSpec {
                containers: vec![Container {
                    name: "runner".to_string(),
                    image: "busybox".to_string(),
                    command: vec!["noop".to_string()],
                }],
                restart_policy: RestartPolicy::OnFailure,
            },
        )
    }

    #[tokio::test]
    async fn test_create_and_get_job() {
        let store = MemoryStore::new();
        let created = store.create_job(&job("report")).await.unwrap();
        assert!(created.meta.resource_version > 0);

        let fetched = store.get_job(&created.key()).await.unwrap();
        assert_eq!(fetched.meta.resource_version, created.meta.resource_version);
        assert_eq!(fetched.spec, created.spec);
    }

    #[tokio::test]
    async fn test_get_missing_job_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .get_job(&ResourceKey::new("default", "nope"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_already_exists() {
        let store = MemoryStore::new();
        store.create_job(&job("report")).await.unwrap();
        let err = store.create_job(&job("report")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_stale_status_write_conflicts() {
        let store = MemoryStore::new();
        let stale = store.create_job(&job("report")).await.unwrap();

        // A concurrent writer bumps the version.
        let mut fresh = stale.clone();
        fresh.status.phase = Phase::Running;
        store.update_job_status(&fresh).await.unwrap();

        let mut retry = stale;
        retry.status.phase = Phase::Done;
        let err = store.update_job_status(&retry).await.unwrap_err();
        assert!(err.is_conflict());

        // Host retry pattern: re-read, then write.
        let mut current = store.get_job(&fresh.key()).await.unwrap();
        current.status.phase = Phase::Done;
        store.update_job_status(&current).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_and_spec_are_separate_write_channels() {
        let store = MemoryStore::new();
        let created = store.create_job(&job("report")).await.unwrap();

        let mut with_status = created.clone();
        with_status.status.phase = Phase::Running;
        with_status.spec.command = "ignored by status write".to_string();
        let after_status = store.update_job_status(&with_status).await.unwrap();
        assert_eq!(after_status.spec.command, "noop");
        assert_eq!(after_status.phase(), Phase::Running);

        let mut with_spec = after_status.clone();
        with_spec.spec.command = "echo hi".to_string();
        with_spec.status.phase = Phase::Done;
        let after_spec = store.update_job(&with_spec).await.unwrap();
        assert_eq!(after_spec.spec.command, "echo hi");
        assert_eq!(after_spec.phase(), Phase::Running);
    }

    #[tokio::test]
    async fn test_delete_job_cascades_to_owned_workloads() {
        let store = MemoryStore::new();
        let owner = store.create_job(&job("report")).await.unwrap();

        let mut dependent = workload("report-runner");
        RefLinker::new().link(&owner, &mut dependent).unwrap();
        let dependent = store.create_workload(&dependent).await.unwrap();

        let unrelated = store.create_workload(&workload("other-runner")).await.unwrap();

        store.delete_job(&owner.key()).await.unwrap();

        assert!(store
            .get_workload(&dependent.key())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store.get_workload(&unrelated.key()).await.is_ok());
    }

    #[tokio::test]
    async fn test_watch_sees_workload_events_with_owner() {
        let store = MemoryStore::new();
        let mut watch = store.watch();

        let owner = store.create_job(&job("report")).await.unwrap();
        let mut dependent = workload("report-runner");
        RefLinker::new().link(&owner, &mut dependent).unwrap();
        store.create_workload(&dependent).await.unwrap();

        let event = watch.recv().await.unwrap();
        assert_eq!(event.kind, ObjectKind::Job);
        assert_eq!(event.key, owner.key());

        let event = watch.recv().await.unwrap();
        assert_eq!(event.kind, ObjectKind::Workload);
        assert_eq!(event.owner, Some(owner.key()));
    }

    #[tokio::test]
    async fn test_list_workloads_filters_by_namespace() {
        let store = MemoryStore::new();
        store.create_workload(&workload("a-runner")).await.unwrap();
        store.create_workload(&workload("b-runner")).await.unwrap();
        store
            .create_workload(&Workload::new(
                "other",
                "c-runner",
                workload("c").spec.clone(),
            ))
            .await
            .unwrap();

        assert_eq!(store.list_workloads("default").await.unwrap().len(), 2);
        assert_eq!(store.list_workloads("other").await.unwrap().len(), 1);
    }
}
