// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
//
// Provides the same API as the PostgreSQL repository, backed by in-memory
// maps, so the control plane can run without a database. All data is lost on
// restart.

use anyhow::Result;
use parking_lot::RwLock;
use podplane_core::{ComputeSummary, EventRecord};
use std::collections::HashMap;

/// In-memory event log and summary projection
#[derive(Default)]
pub struct InMemoryDatabase {
    // Append order within one aggregate is the Vec order
    events: RwLock<HashMap<String, Vec<EventRecord>>>,
    summaries: RwLock<HashMap<String, ComputeSummary>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // Event log
    // ============================================

    pub async fn append_event(&self, record: &EventRecord) -> Result<()> {
        self.events
            .write()
            .entry(record.aggregate_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    pub async fn get_events(&self, aggregate_id: &str) -> Result<Vec<EventRecord>> {
        Ok(self
            .events
            .read()
            .get(aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    // ============================================
    // Summary projection
    // ============================================

    pub async fn upsert_summary(&self, summary: &ComputeSummary) -> Result<()> {
        self.summaries
            .write()
            .insert(summary.id.clone(), summary.clone());
        Ok(())
    }

    pub async fn get_summary(&self, id: &str) -> Result<Option<ComputeSummary>> {
        Ok(self.summaries.read().get(id).cloned())
    }

    pub async fn list_summaries(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ComputeSummary>> {
        let mut rows: Vec<ComputeSummary> = self
            .summaries
            .read()
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use podplane_core::{ComputeStatus, ComputeSummary};
    use serde_json::json;

    fn record(aggregate_id: &str, event_type: &str) -> EventRecord {
        EventRecord {
            aggregate_id: aggregate_id.to_string(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            payload: json!({}),
        }
    }

    fn summary(id: &str, owner_id: &str) -> ComputeSummary {
        ComputeSummary {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            status: ComputeStatus::Initializing,
            ip_address: None,
            pod_name: None,
            pod_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            started_at: None,
            last_active: None,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn events_come_back_in_append_order() {
        let db = InMemoryDatabase::new();
        db.append_event(&record("cmp-1", "compute.created")).await.unwrap();
        db.append_event(&record("cmp-1", "compute.started")).await.unwrap();
        db.append_event(&record("cmp-2", "compute.created")).await.unwrap();
        db.append_event(&record("cmp-1", "compute.terminated")).await.unwrap();

        let history = db.get_events("cmp-1").await.unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["compute.created", "compute.started", "compute.terminated"]
        );

        assert!(db.get_events("cmp-404").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_owner_scoped() {
        let db = InMemoryDatabase::new();
        db.upsert_summary(&summary("cmp-a", "alice")).await.unwrap();
        db.upsert_summary(&summary("cmp-b", "bob")).await.unwrap();
        db.upsert_summary(&summary("cmp-c", "alice")).await.unwrap();

        let rows = db.list_summaries("alice", 100, 0).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|s| s.owner_id == "alice"));
    }

    #[tokio::test]
    async fn list_respects_limit_and_offset() {
        let db = InMemoryDatabase::new();
        for i in 0..5 {
            db.upsert_summary(&summary(&format!("cmp-{i}"), "alice"))
                .await
                .unwrap();
        }

        let page = db.list_summaries("alice", 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        let rest = db.list_summaries("alice", 10, 4).await.unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let db = InMemoryDatabase::new();
        let mut row = summary("cmp-a", "alice");
        db.upsert_summary(&row).await.unwrap();

        row.status = ComputeStatus::Running;
        row.ip_address = Some("10.9.8.7".to_string());
        db.upsert_summary(&row).await.unwrap();

        let stored = db.get_summary("cmp-a").await.unwrap().unwrap();
        assert_eq!(stored.status, ComputeStatus::Running);
        assert_eq!(stored.ip_address.as_deref(), Some("10.9.8.7"));
    }
}
