// Pod Directory - capability interface over the container orchestrator
//
// The proxy and the lifecycle service only ever talk to this trait, so the
// core stays orchestrator-agnostic. Kubernetes (or any other adapter) is a
// separate crate implementing PodDirectory; an in-memory adapter ships with
// the control plane for dev mode and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Live, non-persisted view of one backend pod.
///
/// Re-resolved per proxy request: it encodes orchestrator-assigned physical
/// truth (IP, readiness) that the event log cannot hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodInfo {
    pub compute_id: String,
    pub pod_name: String,
    pub ip: String,
    pub is_ready: bool,
}

/// Resource requests for one pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodResources {
    pub cpu: String,
    pub memory: String,
}

/// What the orchestrator needs to schedule a pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodSpec {
    pub compute_id: String,
    pub image: String,
    pub resources: PodResources,
    pub ports: Vec<u16>,
    pub env: HashMap<String, String>,
}

/// Errors surfaced by a Pod Directory adapter.
///
/// `NotFound` means "no such pod". A pod that exists but is not Ready is NOT
/// an error: it resolves to `PodInfo { is_ready: false }` - callers depend on
/// the distinction to choose the correct failure response.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("pod not found: {0}")]
    NotFound(String),
    #[error("orchestrator error: {0}")]
    Orchestrator(String),
}

/// Capability interface over the orchestrator. No internal state.
///
/// `create` and `delete` are idempotent: deleting an absent pod is Ok. The
/// implementation must tolerate unbounded concurrent `resolve` calls - the
/// proxy hot path hits it once per request.
#[async_trait]
pub trait PodDirectory: Send + Sync {
    /// Resolve a compute ID to its live pod, ready or not.
    async fn resolve(&self, compute_id: &str) -> Result<PodInfo, DirectoryError>;

    /// List all pods this directory knows about.
    async fn list(&self) -> Result<Vec<PodInfo>, DirectoryError>;

    /// Schedule a pod for a compute instance.
    async fn create(&self, spec: PodSpec) -> Result<PodInfo, DirectoryError>;

    /// Tear a pod down. Deleting an absent pod is not an error.
    async fn delete(&self, compute_id: &str) -> Result<(), DirectoryError>;
}
