use crate::{
    error::{ApiError, Result},
    models::{NewTrackerItem, TrackerFilter, TrackerItem, TrackerType},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Executor, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

/// Persistence seam for tracker items. All lookups are scoped to a user.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Look up an item by its uniqueness key.
    async fn find_by_key(
        &self,
        user_id: Uuid,
        item_type: TrackerType,
        title_normalized: &str,
    ) -> Result<Option<TrackerItem>>;

    async fn find_for_user(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<TrackerItem>>;

    /// Items ordered by `finished_at` (newest first, unfinished last), then `created_at`.
    async fn list(&self, user_id: Uuid, filter: &TrackerFilter) -> Result<Vec<TrackerItem>>;

    async fn insert(&self, item: NewTrackerItem) -> Result<TrackerItem>;

    /// Overwrite every mutable column of an existing item.
    async fn update(&self, item: &TrackerItem) -> Result<TrackerItem>;

    async fn delete(&self, item_id: Uuid) -> Result<()>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracker_items (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    item_type TEXT NOT NULL,
    status TEXT NOT NULL,
    title TEXT NOT NULL,
    title_normalized TEXT NOT NULL,
    creator TEXT,
    rating DOUBLE PRECISION,
    notes TEXT,
    tags TEXT[] NOT NULL DEFAULT '{}',
    source TEXT NOT NULL,
    is_recommendation BOOLEAN NOT NULL DEFAULT FALSE,
    source_note_id UUID,
    started_at TIMESTAMPTZ,
    finished_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (user_id, item_type, title_normalized)
);
CREATE INDEX IF NOT EXISTS tracker_items_user_idx ON tracker_items (user_id);
"#;

const COLUMNS: &str = "id, user_id, item_type, status, title, title_normalized, creator, rating, \
     notes, tags, source, is_recommendation, source_note_id, started_at, finished_at, \
     created_at, updated_at";

/// PostgreSQL-backed tracker store
#[derive(Debug, Clone)]
pub struct PostgresTrackerStore {
    pool: PgPool,
}

impl PostgresTrackerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and indexes if they don't exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.pool.execute(SCHEMA).await?;
        info!("Tracker item schema is up to date");
        Ok(())
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: String| ApiError::SerializationError(format!("{}: {}", column, e)))
}

fn item_from_row(row: &PgRow) -> Result<TrackerItem> {
    Ok(TrackerItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        item_type: parse_column(row, "item_type")?,
        status: parse_column(row, "status")?,
        title: row.try_get("title")?,
        title_normalized: row.try_get("title_normalized")?,
        creator: row.try_get("creator")?,
        rating: row.try_get("rating")?,
        notes: row.try_get("notes")?,
        tags: row.try_get("tags")?,
        source: parse_column(row, "source")?,
        is_recommendation: row.try_get("is_recommendation")?,
        source_note_id: row.try_get("source_note_id")?,
        started_at: row.try_get::<Option<DateTime<Utc>>, _>("started_at")?,
        finished_at: row.try_get::<Option<DateTime<Utc>>, _>("finished_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TrackerStore for PostgresTrackerStore {
    async fn find_by_key(
        &self,
        user_id: Uuid,
        item_type: TrackerType,
        title_normalized: &str,
    ) -> Result<Option<TrackerItem>> {
        let sql = format!(
            "SELECT {} FROM tracker_items \
             WHERE user_id = $1 AND item_type = $2 AND title_normalized = $3",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(item_type.as_str())
            .bind(title_normalized)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_for_user(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<TrackerItem>> {
        let sql = format!(
            "SELECT {} FROM tracker_items WHERE id = $1 AND user_id = $2",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn list(&self, user_id: Uuid, filter: &TrackerFilter) -> Result<Vec<TrackerItem>> {
        // NULL parameters disable the corresponding filter.
        let sql = format!(
            "SELECT {} FROM tracker_items \
             WHERE user_id = $1 \
               AND ($2::TEXT IS NULL OR item_type = $2) \
               AND ($3::TEXT IS NULL OR status = $3) \
               AND ($4::BOOLEAN IS NULL OR is_recommendation = $4) \
               AND ($5::INT IS NULL OR \
                    EXTRACT(YEAR FROM COALESCE(finished_at, created_at) AT TIME ZONE 'UTC')::INT = $5) \
             ORDER BY finished_at DESC NULLS LAST, created_at DESC",
            COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(filter.item_type.map(|t| t.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.is_recommendation)
            .bind(filter.year)
            .fetch_all(&self.pool)
            .await?;

        debug!("Fetched {} tracker items for user {}", rows.len(), user_id);
        rows.iter().map(item_from_row).collect()
    }

    async fn insert(&self, new: NewTrackerItem) -> Result<TrackerItem> {
        let item = TrackerItem::from_new(new);
        sqlx::query(
            "INSERT INTO tracker_items (id, user_id, item_type, status, title, title_normalized, \
             creator, rating, notes, tags, source, is_recommendation, source_note_id, started_at, \
             finished_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(item.id)
        .bind(item.user_id)
        .bind(item.item_type.as_str())
        .bind(item.status.as_str())
        .bind(&item.title)
        .bind(&item.title_normalized)
        .bind(&item.creator)
        .bind(item.rating)
        .bind(&item.notes)
        .bind(&item.tags)
        .bind(item.source.as_str())
        .bind(item.is_recommendation)
        .bind(item.source_note_id)
        .bind(item.started_at)
        .bind(item.finished_at)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    async fn update(&self, item: &TrackerItem) -> Result<TrackerItem> {
        let mut updated = item.clone();
        updated.updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE tracker_items SET item_type = $2, status = $3, title = $4, \
             title_normalized = $5, creator = $6, rating = $7, notes = $8, tags = $9, \
             is_recommendation = $10, started_at = $11, finished_at = $12, updated_at = $13 \
             WHERE id = $1",
        )
        .bind(updated.id)
        .bind(updated.item_type.as_str())
        .bind(updated.status.as_str())
        .bind(&updated.title)
        .bind(&updated.title_normalized)
        .bind(&updated.creator)
        .bind(updated.rating)
        .bind(&updated.notes)
        .bind(&updated.tags)
        .bind(updated.is_recommendation)
        .bind(updated.started_at)
        .bind(updated.finished_at)
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Tracker item not found".to_string()));
        }

        Ok(updated)
    }

    async fn delete(&self, item_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tracker_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Tracker item not found".to_string()));
        }

        Ok(())
    }
}
