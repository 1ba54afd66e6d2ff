// Compute aggregate and its projection row
//
// ComputeState is derived state: a pure fold over the aggregate's event
// history, rebuilt fresh on every command and never cached as truth.
// ComputeSummary is the denormalized read-model row kept in the projection
// store for list/get.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::events::{
    self, ComputeCreateFailed, ComputeCreated, ComputeStarted, ComputeTerminated, EventRecord,
};

/// Lifecycle status of one compute instance.
///
/// Monotonic along initializing -> running -> terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ComputeStatus {
    Initializing,
    Running,
    Terminated,
}

impl ComputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeStatus::Initializing => "initializing",
            ComputeStatus::Running => "running",
            ComputeStatus::Terminated => "terminated",
        }
    }
}

impl From<&str> for ComputeStatus {
    fn from(s: &str) -> Self {
        match s {
            "running" => ComputeStatus::Running,
            "terminated" => ComputeStatus::Terminated,
            _ => ComputeStatus::Initializing,
        }
    }
}

/// Error raised while folding an event history.
///
/// A malformed payload for a known event type is fatal: it means the log is
/// corrupt and silently skipping it would break the audit guarantee. Unknown
/// event types are NOT an error; they fold as no-ops.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("malformed {event_type} payload for {aggregate_id}: {source}")]
    MalformedPayload {
        aggregate_id: String,
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Current state of a compute instance, derived by replaying its events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeState {
    pub id: String,
    pub owner_id: String,
    pub status: ComputeStatus,
    pub preset_id: String,
    pub ip_address: Option<String>,
    pub pod_name: Option<String>,
    pub pod_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ComputeState {
    /// Rebuild the current state from an ordered event history.
    ///
    /// Pure: no I/O, and replaying an identical sequence twice yields
    /// identical state.
    pub fn replay(id: &str, history: &[EventRecord]) -> Result<Self, ReplayError> {
        let mut state = ComputeState {
            id: id.to_string(),
            owner_id: String::new(),
            status: ComputeStatus::Initializing,
            preset_id: String::new(),
            ip_address: None,
            pod_name: None,
            pod_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            started_at: None,
            last_active: None,
            last_error: None,
        };
        for record in history {
            state.apply(record)?;
        }
        Ok(state)
    }

    fn apply(&mut self, record: &EventRecord) -> Result<(), ReplayError> {
        match record.event_type.as_str() {
            events::COMPUTE_CREATED => {
                let data: ComputeCreated = self.decode(record)?;
                self.owner_id = data.owner_id;
                self.preset_id = data.preset_id;
                self.status = ComputeStatus::Initializing;
                self.created_at = record.timestamp;
            }
            events::COMPUTE_STARTED => {
                let data: ComputeStarted = self.decode(record)?;
                // Status is monotonic: a stray start after termination is ignored
                if self.status == ComputeStatus::Initializing {
                    self.status = ComputeStatus::Running;
                    self.ip_address = Some(data.ip_address);
                    self.pod_name = Some(data.pod_name);
                    self.pod_url = Some(data.pod_url);
                    self.started_at = Some(record.timestamp);
                    self.last_active = Some(record.timestamp);
                }
            }
            events::COMPUTE_CREATE_FAILED => {
                let data: ComputeCreateFailed = self.decode(record)?;
                if self.status == ComputeStatus::Initializing {
                    self.last_error = Some(data.error);
                }
            }
            events::COMPUTE_TERMINATED => {
                let data: ComputeTerminated = self.decode(record)?;
                self.status = ComputeStatus::Terminated;
                self.last_error = None;
                self.last_active = Some(record.timestamp);
                let _ = data.reason;
            }
            // Unknown event types from newer writers fold as no-ops
            other => {
                tracing::debug!(event_type = other, aggregate_id = %self.id, "skipping unknown event type");
            }
        }
        self.updated_at = record.timestamp;
        Ok(())
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &self,
        record: &EventRecord,
    ) -> Result<T, ReplayError> {
        serde_json::from_value(record.payload.clone()).map_err(|source| {
            ReplayError::MalformedPayload {
                aggregate_id: self.id.clone(),
                event_type: record.event_type.clone(),
                source,
            }
        })
    }
}

/// Denormalized projection row mirroring the aggregate plus owner scoping.
///
/// Kept in sync after every command; always rebuildable from the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ComputeSummary {
    pub id: String,
    pub owner_id: String,
    pub status: ComputeStatus,
    pub ip_address: Option<String>,
    pub pod_name: Option<String>,
    pub pod_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<ComputeState> for ComputeSummary {
    fn from(state: ComputeState) -> Self {
        ComputeSummary {
            id: state.id,
            owner_id: state.owner_id,
            status: state.status,
            ip_address: state.ip_address,
            pod_name: state.pod_name,
            pod_url: state.pod_url,
            created_at: state.created_at,
            updated_at: state.updated_at,
            started_at: state.started_at,
            last_active: state.last_active,
            last_error: state.last_error,
        }
    }
}
