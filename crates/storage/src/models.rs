// Row types for the Postgres backend

use chrono::{DateTime, Utc};
use podplane_core::{ComputeStatus, ComputeSummary, EventRecord};
use sqlx::FromRow;

/// Row of the `compute_events` table
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub aggregate_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        EventRecord {
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            timestamp: row.timestamp,
            payload: row.payload,
        }
    }
}

/// Row of the `compute_summaries` table
#[derive(Debug, Clone, FromRow)]
pub struct SummaryRow {
    pub id: String,
    pub owner_id: String,
    pub status: String,
    pub ip_address: Option<String>,
    pub pod_name: Option<String>,
    pub pod_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<SummaryRow> for ComputeSummary {
    fn from(row: SummaryRow) -> Self {
        ComputeSummary {
            id: row.id,
            owner_id: row.owner_id,
            status: ComputeStatus::from(row.status.as_str()),
            ip_address: row.ip_address,
            pod_name: row.pod_name,
            pod_url: row.pod_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            last_active: row.last_active,
            last_error: row.last_error,
        }
    }
}
