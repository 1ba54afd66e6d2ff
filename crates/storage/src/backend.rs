// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// A unified StorageBackend that can work with either PostgreSQL (production)
// or in-memory (dev mode) storage. The lifecycle service only sees this type.

use anyhow::Result;
use podplane_core::{ComputeSummary, EventRecord};
use std::sync::Arc;

use crate::memory::InMemoryDatabase;
use crate::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL and apply
    /// pending migrations
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        db.run_migrations().await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Check if this is dev mode (in-memory)
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    // ============================================
    // Event log
    // ============================================

    pub async fn append_event(&self, record: &EventRecord) -> Result<()> {
        match self {
            Self::Postgres(db) => db.append_event(record).await,
            Self::InMemory(db) => db.append_event(record).await,
        }
    }

    pub async fn get_events(&self, aggregate_id: &str) -> Result<Vec<EventRecord>> {
        match self {
            Self::Postgres(db) => db.get_events(aggregate_id).await,
            Self::InMemory(db) => db.get_events(aggregate_id).await,
        }
    }

    // ============================================
    // Summary projection
    // ============================================

    pub async fn upsert_summary(&self, summary: &ComputeSummary) -> Result<()> {
        match self {
            Self::Postgres(db) => db.upsert_summary(summary).await,
            Self::InMemory(db) => db.upsert_summary(summary).await,
        }
    }

    pub async fn get_summary(&self, id: &str) -> Result<Option<ComputeSummary>> {
        match self {
            Self::Postgres(db) => db.get_summary(id).await,
            Self::InMemory(db) => db.get_summary(id).await,
        }
    }

    pub async fn list_summaries(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ComputeSummary>> {
        match self {
            Self::Postgres(db) => db.list_summaries(owner_id, limit, offset).await,
            Self::InMemory(db) => db.list_summaries(owner_id, limit, offset).await,
        }
    }
}
