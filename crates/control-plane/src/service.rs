// Compute lifecycle service
//
// Turns create/terminate commands into orchestrator calls plus event appends,
// and keeps the summary projection in sync after every command. The event log
// is the system of record; the aggregate is rebuilt fresh for each command
// and never cached.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use podplane_core::{
    ComputeCreateFailed, ComputeCreated, ComputeError, ComputeEvent, ComputeStarted, ComputeState,
    ComputeSummary, ComputeTerminated, DirectoryError, EventRecord, PodDirectory, PodSpec,
    PresetManager, Result,
};
use podplane_storage::StorageBackend;
use uuid::Uuid;

pub struct ComputeLifecycle {
    storage: StorageBackend,
    directory: Arc<dyn PodDirectory>,
    presets: Arc<dyn PresetManager>,
    routing_domain: String,
    default_preset_id: String,
    // Commands against the same compute ID must not interleave their
    // append sequences; the store itself does not order concurrent writers.
    // Entries are never removed: bounded by the number of computes ever seen.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ComputeLifecycle {
    pub fn new(
        storage: StorageBackend,
        directory: Arc<dyn PodDirectory>,
        presets: Arc<dyn PresetManager>,
        routing_domain: impl Into<String>,
        default_preset_id: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            directory,
            presets,
            routing_domain: routing_domain.into(),
            default_preset_id: default_preset_id.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn serialize(&self, compute_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let entry = self
            .locks
            .lock()
            .entry(compute_id.to_string())
            .or_default()
            .clone();
        entry.lock_owned().await
    }

    async fn append(&self, compute_id: &str, event: ComputeEvent) -> Result<()> {
        let record =
            EventRecord::new(compute_id, &event).map_err(ComputeError::event_store)?;
        self.storage
            .append_event(&record)
            .await
            .map_err(ComputeError::event_store)
    }

    /// Replay the aggregate and push the result into the projection.
    async fn refresh_summary(&self, compute_id: &str) -> Result<ComputeSummary> {
        let history = self
            .storage
            .get_events(compute_id)
            .await
            .map_err(ComputeError::event_store)?;
        if history.is_empty() {
            return Err(ComputeError::NotFound(compute_id.to_string()));
        }
        let state = ComputeState::replay(compute_id, &history)
            .map_err(|err| ComputeError::Internal(anyhow::Error::new(err)))?;
        let summary = ComputeSummary::from(state);
        self.storage
            .upsert_summary(&summary)
            .await
            .map_err(ComputeError::event_store)?;
        Ok(summary)
    }

    /// Provision a new compute instance for an owner.
    pub async fn create_compute(
        &self,
        owner_id: &str,
        preset_id: Option<&str>,
    ) -> Result<ComputeSummary> {
        if owner_id.is_empty() {
            return Err(ComputeError::OwnerNotAuthenticated);
        }

        let compute_id = format!("cmp_{}", Uuid::now_v7().simple());
        let _guard = self.serialize(&compute_id).await;

        let preset_id = preset_id
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_preset_id)
            .to_string();

        self.append(
            &compute_id,
            ComputeEvent::Created(ComputeCreated {
                owner_id: owner_id.to_string(),
                preset_id: preset_id.clone(),
            }),
        )
        .await?;

        // Preset resolution failures abort before any orchestrator call
        let preset = match self.presets.resolve(&preset_id).await {
            Ok(preset) => preset,
            Err(err) => {
                self.refresh_summary(&compute_id).await?;
                return Err(err.into());
            }
        };

        let spec = PodSpec {
            compute_id: compute_id.clone(),
            image: preset.image,
            resources: preset.resources,
            ports: preset.ports,
            env: preset.env,
        };

        match self.directory.create(spec).await {
            Ok(pod) => {
                let pod_url = format!("https://{}.{}", compute_id, self.routing_domain);
                self.append(
                    &compute_id,
                    ComputeEvent::Started(ComputeStarted {
                        ip_address: pod.ip,
                        pod_name: pod.pod_name,
                        pod_url,
                    }),
                )
                .await?;
                let summary = self.refresh_summary(&compute_id).await?;
                tracing::info!(compute_id = %compute_id, owner_id = %owner_id, "compute created");
                Ok(summary)
            }
            Err(err) => {
                // ComputeCreated is not rolled back; the failure is recorded
                // so a reconciler can tell "never scheduled" from "running".
                tracing::error!(compute_id = %compute_id, error = %err, "orchestrator create failed");
                self.append(
                    &compute_id,
                    ComputeEvent::CreateFailed(ComputeCreateFailed {
                        error: err.to_string(),
                    }),
                )
                .await?;
                self.refresh_summary(&compute_id).await?;
                Err(ComputeError::Orchestrator(err.to_string()))
            }
        }
    }

    /// Record termination intent and tear the pod down.
    ///
    /// Succeeds even when the pod is already gone: termination records
    /// intent, not physical state.
    pub async fn terminate_compute(
        &self,
        owner_id: &str,
        compute_id: &str,
        reason: &str,
    ) -> Result<ComputeSummary> {
        if owner_id.is_empty() {
            return Err(ComputeError::OwnerNotAuthenticated);
        }

        let _guard = self.serialize(compute_id).await;

        let history = self
            .storage
            .get_events(compute_id)
            .await
            .map_err(ComputeError::event_store)?;
        if history.is_empty() {
            return Err(ComputeError::NotFound(compute_id.to_string()));
        }
        let state = ComputeState::replay(compute_id, &history)
            .map_err(|err| ComputeError::Internal(anyhow::Error::new(err)))?;
        if state.owner_id != owner_id {
            // Do not leak other owners' computes
            return Err(ComputeError::NotFound(compute_id.to_string()));
        }

        match self.directory.delete(compute_id).await {
            Ok(()) | Err(DirectoryError::NotFound(_)) => {}
            Err(DirectoryError::Orchestrator(err)) => {
                return Err(ComputeError::Orchestrator(err));
            }
        }

        self.append(
            compute_id,
            ComputeEvent::Terminated(ComputeTerminated {
                reason: reason.to_string(),
            }),
        )
        .await?;
        let summary = self.refresh_summary(compute_id).await?;
        tracing::info!(compute_id = %compute_id, reason = %reason, "compute terminated");
        Ok(summary)
    }

    /// Read one compute from the projection. Never replays on the read path.
    pub async fn get_compute(&self, owner_id: &str, compute_id: &str) -> Result<ComputeSummary> {
        if owner_id.is_empty() {
            return Err(ComputeError::OwnerNotAuthenticated);
        }
        let summary = self
            .storage
            .get_summary(compute_id)
            .await
            .map_err(ComputeError::event_store)?
            .filter(|s| s.owner_id == owner_id);
        summary.ok_or_else(|| ComputeError::NotFound(compute_id.to_string()))
    }

    /// List an owner's computes from the projection, newest first.
    pub async fn list_computes(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ComputeSummary>> {
        if owner_id.is_empty() {
            return Err(ComputeError::OwnerNotAuthenticated);
        }
        let limit = limit.clamp(1, 200);
        let offset = offset.max(0);
        self.storage
            .list_summaries(owner_id, limit, offset)
            .await
            .map_err(ComputeError::event_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryPodDirectory;
    use podplane_core::{ComputeStatus, StaticPresetManager};

    const DOMAIN: &str = "preview.computesdk.com";

    fn service() -> (ComputeLifecycle, Arc<MemoryPodDirectory>) {
        let directory = Arc::new(MemoryPodDirectory::new());
        let lifecycle = ComputeLifecycle::new(
            StorageBackend::in_memory(),
            directory.clone(),
            Arc::new(StaticPresetManager::default()),
            DOMAIN,
            "base",
        );
        (lifecycle, directory)
    }

    #[tokio::test]
    async fn create_produces_a_running_compute() {
        let (lifecycle, directory) = service();
        let summary = lifecycle.create_compute("alice", None).await.unwrap();

        assert_eq!(summary.status, ComputeStatus::Running);
        assert!(summary.id.starts_with("cmp_"));
        assert!(summary.ip_address.is_some());
        assert_eq!(
            summary.pod_url.as_deref(),
            Some(format!("https://{}.{}", summary.id, DOMAIN).as_str())
        );

        // The pod is resolvable through the directory under the same ID
        let pod = directory.resolve(&summary.id).await.unwrap();
        assert!(pod.is_ready);
    }

    #[tokio::test]
    async fn create_then_terminate_reports_terminated() {
        let (lifecycle, directory) = service();
        let created = lifecycle.create_compute("alice", None).await.unwrap();

        let terminated = lifecycle
            .terminate_compute("alice", &created.id, "user requested")
            .await
            .unwrap();
        assert_eq!(terminated.status, ComputeStatus::Terminated);

        let fetched = lifecycle.get_compute("alice", &created.id).await.unwrap();
        assert_eq!(fetched.status, ComputeStatus::Terminated);

        // The pod is gone
        assert!(directory.resolve(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn second_terminate_does_not_error() {
        let (lifecycle, _) = service();
        let created = lifecycle.create_compute("alice", None).await.unwrap();

        lifecycle
            .terminate_compute("alice", &created.id, "first")
            .await
            .unwrap();
        let again = lifecycle
            .terminate_compute("alice", &created.id, "second")
            .await
            .unwrap();
        assert_eq!(again.status, ComputeStatus::Terminated);
    }

    #[tokio::test]
    async fn invalid_preset_aborts_before_the_orchestrator() {
        let (lifecycle, directory) = service();
        let err = lifecycle
            .create_compute("alice", Some("gpu-xl"))
            .await
            .unwrap_err();

        assert!(matches!(err, ComputeError::InvalidPreset(_)));
        assert!(directory.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn orchestrator_failure_is_recorded_and_surfaced() {
        let (lifecycle, directory) = service();
        directory.fail_creates("quota exceeded");

        let err = lifecycle.create_compute("alice", None).await.unwrap_err();
        assert!(matches!(err, ComputeError::Orchestrator(_)));

        // The compute stays visible as initializing with the failure recorded
        let computes = lifecycle.list_computes("alice", 10, 0).await.unwrap();
        assert_eq!(computes.len(), 1);
        assert_eq!(computes[0].status, ComputeStatus::Initializing);
        assert!(computes[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("quota exceeded"));
    }

    #[tokio::test]
    async fn list_never_crosses_owners() {
        let (lifecycle, _) = service();
        lifecycle.create_compute("alice", None).await.unwrap();
        lifecycle.create_compute("bob", None).await.unwrap();
        lifecycle.create_compute("alice", None).await.unwrap();

        let alices = lifecycle.list_computes("alice", 50, 0).await.unwrap();
        assert_eq!(alices.len(), 2);
        assert!(alices.iter().all(|s| s.owner_id == "alice"));

        let bobs = lifecycle.list_computes("bob", 50, 0).await.unwrap();
        assert_eq!(bobs.len(), 1);
    }

    #[tokio::test]
    async fn other_owners_cannot_terminate_or_get() {
        let (lifecycle, _) = service();
        let created = lifecycle.create_compute("alice", None).await.unwrap();

        let err = lifecycle.get_compute("mallory", &created.id).await.unwrap_err();
        assert!(matches!(err, ComputeError::NotFound(_)));

        let err = lifecycle
            .terminate_compute("mallory", &created.id, "hijack")
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_owner_is_rejected() {
        let (lifecycle, _) = service();
        let err = lifecycle.create_compute("", None).await.unwrap_err();
        assert!(matches!(err, ComputeError::OwnerNotAuthenticated));
    }

    use async_trait::async_trait;
    use podplane_core::PodInfo;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Directory whose deletes park long enough for concurrent commands to
    /// pile up, recording how many ran at once.
    #[derive(Default)]
    struct SlowDeleteDirectory {
        inner: MemoryPodDirectory,
        inflight: AtomicU32,
        max_inflight: AtomicU32,
    }

    #[async_trait]
    impl PodDirectory for SlowDeleteDirectory {
        async fn resolve(&self, compute_id: &str) -> std::result::Result<PodInfo, DirectoryError> {
            self.inner.resolve(compute_id).await
        }

        async fn list(&self) -> std::result::Result<Vec<PodInfo>, DirectoryError> {
            self.inner.list().await
        }

        async fn create(&self, spec: PodSpec) -> std::result::Result<PodInfo, DirectoryError> {
            self.inner.create(spec).await
        }

        async fn delete(&self, compute_id: &str) -> std::result::Result<(), DirectoryError> {
            let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_inflight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            self.inner.delete(compute_id).await
        }
    }

    #[tokio::test]
    async fn concurrent_commands_on_one_compute_are_serialized() {
        let storage = StorageBackend::in_memory();
        let directory = Arc::new(SlowDeleteDirectory::default());
        let lifecycle = Arc::new(ComputeLifecycle::new(
            storage.clone(),
            directory.clone(),
            Arc::new(StaticPresetManager::default()),
            DOMAIN,
            "base",
        ));

        let created = lifecycle.create_compute("alice", None).await.unwrap();
        let id = created.id.clone();

        let spawn_terminate = |reason: &'static str| {
            let lifecycle = lifecycle.clone();
            let id = id.clone();
            tokio::spawn(async move { lifecycle.terminate_compute("alice", &id, reason).await })
        };
        let (a, b, c) = tokio::join!(
            spawn_terminate("first"),
            spawn_terminate("second"),
            spawn_terminate("third"),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();
        c.unwrap().unwrap();

        // The per-aggregate lock never let two deletes overlap
        assert_eq!(directory.max_inflight.load(Ordering::SeqCst), 1);

        // The history is a clean sequence, not an interleaving
        let history = storage.get_events(&id).await.unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types.len(), 5);
        assert_eq!(&types[..2], ["compute.created", "compute.started"]);
        assert!(types[2..].iter().all(|t| *t == "compute.terminated"));
    }
}
