// Compute lifecycle events
//
// EventRecord is what the event store persists: an opaque `event_type` string
// plus a JSON payload. ComputeEvent is the typed view used when appending.
// Readers fold records by matching on the type string so that unknown future
// event types pass through without breaking replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type for [`ComputeCreated`]
pub const COMPUTE_CREATED: &str = "compute.created";
/// Event type for [`ComputeStarted`]
pub const COMPUTE_STARTED: &str = "compute.started";
/// Event type for [`ComputeCreateFailed`]
pub const COMPUTE_CREATE_FAILED: &str = "compute.create_failed";
/// Event type for [`ComputeTerminated`]
pub const COMPUTE_TERMINATED: &str = "compute.terminated";

/// A persisted event as stored in and retrieved from the event store.
///
/// Events for one aggregate are retrieved in exact append order and are never
/// mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub aggregate_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl EventRecord {
    /// Build a record for a typed event, stamped with the current time.
    pub fn new(aggregate_id: impl Into<String>, event: &ComputeEvent) -> serde_json::Result<Self> {
        Ok(Self {
            aggregate_id: aggregate_id.into(),
            event_type: event.event_type().to_string(),
            timestamp: Utc::now(),
            payload: event.payload()?,
        })
    }
}

/// Payload of `compute.created` - the command was accepted and an identity minted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeCreated {
    pub owner_id: String,
    pub preset_id: String,
}

/// Payload of `compute.started` - the orchestrator reported a scheduled pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeStarted {
    pub ip_address: String,
    pub pod_name: String,
    pub pod_url: String,
}

/// Payload of `compute.create_failed` - the orchestrator refused the pod.
///
/// Recorded for audit; the aggregate keeps status `initializing` so a
/// reconciler can distinguish "never scheduled" from "running".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeCreateFailed {
    pub error: String,
}

/// Payload of `compute.terminated` - termination intent was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeTerminated {
    pub reason: String,
}

/// Typed view over the event payloads, used by writers.
#[derive(Debug, Clone)]
pub enum ComputeEvent {
    Created(ComputeCreated),
    Started(ComputeStarted),
    CreateFailed(ComputeCreateFailed),
    Terminated(ComputeTerminated),
}

impl ComputeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ComputeEvent::Created(_) => COMPUTE_CREATED,
            ComputeEvent::Started(_) => COMPUTE_STARTED,
            ComputeEvent::CreateFailed(_) => COMPUTE_CREATE_FAILED,
            ComputeEvent::Terminated(_) => COMPUTE_TERMINATED,
        }
    }

    pub fn payload(&self) -> serde_json::Result<Value> {
        match self {
            ComputeEvent::Created(data) => serde_json::to_value(data),
            ComputeEvent::Started(data) => serde_json::to_value(data),
            ComputeEvent::CreateFailed(data) => serde_json::to_value(data),
            ComputeEvent::Terminated(data) => serde_json::to_value(data),
        }
    }
}
