// PostgreSQL repository for the event log and the summary projection

use anyhow::Result;
use podplane_core::{ComputeSummary, EventRecord};
use sqlx::PgPool;

use crate::models::{EventRow, SummaryRow};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Event log
    // ============================================

    /// Append one event. A single INSERT, so the append is atomic: no
    /// partial write is ever observable.
    pub async fn append_event(&self, record: &EventRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO compute_events (aggregate_id, event_type, timestamp, payload)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.aggregate_id)
        .bind(&record.event_type)
        .bind(record.timestamp)
        .bind(&record.payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Full history for one aggregate, in append order.
    pub async fn get_events(&self, aggregate_id: &str) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT aggregate_id, event_type, timestamp, payload
            FROM compute_events
            WHERE aggregate_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    // ============================================
    // Summary projection
    // ============================================

    pub async fn upsert_summary(&self, summary: &ComputeSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO compute_summaries
                (id, owner_id, status, ip_address, pod_name, pod_url,
                 created_at, updated_at, started_at, last_active, last_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                ip_address = EXCLUDED.ip_address,
                pod_name = EXCLUDED.pod_name,
                pod_url = EXCLUDED.pod_url,
                updated_at = EXCLUDED.updated_at,
                started_at = EXCLUDED.started_at,
                last_active = EXCLUDED.last_active,
                last_error = EXCLUDED.last_error
            "#,
        )
        .bind(&summary.id)
        .bind(&summary.owner_id)
        .bind(summary.status.as_str())
        .bind(&summary.ip_address)
        .bind(&summary.pod_name)
        .bind(&summary.pod_url)
        .bind(summary.created_at)
        .bind(summary.updated_at)
        .bind(summary.started_at)
        .bind(summary.last_active)
        .bind(&summary.last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_summary(&self, id: &str) -> Result<Option<ComputeSummary>> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, owner_id, status, ip_address, pod_name, pod_url,
                   created_at, updated_at, started_at, last_active, last_error
            FROM compute_summaries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ComputeSummary::from))
    }

    pub async fn list_summaries(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ComputeSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, owner_id, status, ip_address, pod_name, pod_url,
                   created_at, updated_at, started_at, last_active, last_error
            FROM compute_summaries
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ComputeSummary::from).collect())
    }
}
