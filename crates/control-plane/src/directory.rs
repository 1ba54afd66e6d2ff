// In-memory Pod Directory adapter
// Decision: Use parking_lot for thread-safe access
//
// Dev-mode stand-in for a real orchestrator adapter: pods are "scheduled"
// instantly with a synthetic cluster IP and report ready immediately. Tests
// use `fail_creates` to simulate orchestrator refusals and `set_ready` to
// exercise the not-ready path.

use async_trait::async_trait;
use parking_lot::RwLock;
use podplane_core::{DirectoryError, PodDirectory, PodInfo, PodSpec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct MemoryPodDirectory {
    pods: RwLock<HashMap<String, PodInfo>>,
    next_ip: AtomicU32,
    fail_creates: RwLock<Option<String>>,
}

impl MemoryPodDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail with the given reason.
    pub fn fail_creates(&self, reason: impl Into<String>) {
        *self.fail_creates.write() = Some(reason.into());
    }

    /// Flip a pod's readiness.
    pub fn set_ready(&self, compute_id: &str, is_ready: bool) {
        if let Some(pod) = self.pods.write().get_mut(compute_id) {
            pod.is_ready = is_ready;
        }
    }
}

#[async_trait]
impl PodDirectory for MemoryPodDirectory {
    async fn resolve(&self, compute_id: &str) -> Result<PodInfo, DirectoryError> {
        self.pods
            .read()
            .get(compute_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(compute_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<PodInfo>, DirectoryError> {
        Ok(self.pods.read().values().cloned().collect())
    }

    async fn create(&self, spec: PodSpec) -> Result<PodInfo, DirectoryError> {
        if let Some(reason) = self.fail_creates.read().clone() {
            return Err(DirectoryError::Orchestrator(reason));
        }
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed);
        let pod = PodInfo {
            compute_id: spec.compute_id.clone(),
            pod_name: format!("pod-{}", spec.compute_id),
            ip: format!("10.42.{}.{}", n / 256, n % 256),
            is_ready: true,
        };
        self.pods.write().insert(spec.compute_id, pod.clone());
        Ok(pod)
    }

    async fn delete(&self, compute_id: &str) -> Result<(), DirectoryError> {
        // Idempotent: deleting an absent pod is not an error
        self.pods.write().remove(compute_id);
        Ok(())
    }
}
