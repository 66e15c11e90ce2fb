// SQLite-backed review queue store.
//
// Tables:
// - moderation_queue: Items awaiting or through human review
//
// The claim is a single conditional UPDATE checked by rows_affected - the
// optimistic-concurrency answer to two moderators grabbing the same item,
// which keeps the service stateless and lock-free.

use crate::core::queue::{
    ItemType, QueueError, QueueFilters, QueueItem, QueueListing, QueueStatus, QueueStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub struct SqliteQueueStore {
    pool: Pool<Sqlite>,
}

impl SqliteQueueStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_type TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                priority INTEGER NOT NULL DEFAULT 3,
                violation_types TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'pending',
                assigned_to INTEGER,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_moderation_queue_triage
                ON moderation_queue(status, priority, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> QueueItem {
    let item_type_str: String = row.get("item_type");
    let status_str: String = row.get("status");
    let types_json: String = row.get("violation_types");
    let created_at_str: String = row.get("created_at");
    QueueItem {
        id: row.get("id"),
        item_type: ItemType::from_str(&item_type_str).unwrap_or(ItemType::Message),
        item_id: row.get("item_id"),
        priority: row.get("priority"),
        violation_types: serde_json::from_str(&types_json).unwrap_or_default(),
        status: QueueStatus::from_str(&status_str).unwrap_or(QueueStatus::Pending),
        assigned_to: row.get("assigned_to"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn list(
        &self,
        filters: &QueueFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<QueueListing>, QueueError> {
        // Dynamic WHERE clause; every condition binds in order below.
        let mut sql = String::from(
            r#"
            SELECT q.*, substr(m.content, 1, 160) AS content_preview
            FROM moderation_queue q
            LEFT JOIN messages m ON q.item_type = 'message' AND m.id = q.item_id
            WHERE 1 = 1
            "#,
        );
        if filters.status.is_some() {
            sql.push_str(" AND q.status = ?");
        }
        if filters.item_type.is_some() {
            sql.push_str(" AND q.item_type = ?");
        }
        if filters.min_priority.is_some() {
            sql.push_str(" AND q.priority >= ?");
        }
        if filters.assigned_to.is_some() {
            sql.push_str(" AND q.assigned_to = ?");
        }
        sql.push_str(" ORDER BY q.priority DESC, q.created_at ASC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filters.status {
            query = query.bind(status.to_string());
        }
        if let Some(item_type) = filters.item_type {
            query = query.bind(item_type.to_string());
        }
        if let Some(min_priority) = filters.min_priority {
            query = query.bind(min_priority);
        }
        if let Some(assigned_to) = filters.assigned_to {
            query = query.bind(assigned_to);
        }
        // i64 math: page and limit are caller-controlled.
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows = query
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| QueueListing {
                item: row_to_item(row),
                content_preview: row.get("content_preview"),
            })
            .collect())
    }

    async fn claim(
        &self,
        item_id: i64,
        moderator_id: i64,
    ) -> Result<Option<QueueItem>, QueueError> {
        let result = sqlx::query(
            r#"
            UPDATE moderation_queue
            SET status = 'in_review', assigned_to = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(moderator_id)
        .bind(item_id)
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;

        if result.rows_affected() == 0 {
            // Missing, or somebody else won the race.
            return Ok(None);
        }

        let row = sqlx::query("SELECT * FROM moderation_queue WHERE id = ?")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(Some(row_to_item(&row)))
    }

    async fn resolve(&self, item_id: i64) -> Result<bool, QueueError> {
        let result = sqlx::query("UPDATE moderation_queue SET status = 'resolved' WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn status_counts(&self) -> Result<Vec<(String, i64)>, QueueError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS total FROM moderation_queue GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("status"), row.get("total")))
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> SqliteQueueStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteQueueStore::new(pool);
        store.migrate().await.unwrap();
        // No messages table here; the LEFT JOIN in list() still needs one.
        sqlx::query("CREATE TABLE messages (id INTEGER PRIMARY KEY, content TEXT)")
            .execute(&store.pool)
            .await
            .unwrap();
        store
    }

    async fn seed_item(store: &SqliteQueueStore, priority: i32, created_at: &str) -> i64 {
        let result = sqlx::query(
            r#"
            INSERT INTO moderation_queue
                (item_type, item_id, priority, violation_types, status, created_at)
            VALUES ('message', 1, ?, '["spam"]', 'pending', ?)
            "#,
        )
        .bind(priority)
        .bind(created_at)
        .execute(&store.pool)
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_then_age() {
        let store = setup().await;
        let low = seed_item(&store, 3, "2026-08-01T10:00:00+00:00").await;
        let high_old = seed_item(&store, 5, "2026-08-01T09:00:00+00:00").await;
        let high_new = seed_item(&store, 5, "2026-08-01T11:00:00+00:00").await;

        let items = store.list(&QueueFilters::default(), 1, 20).await.unwrap();
        let ids: Vec<i64> = items.iter().map(|listing| listing.item.id).collect();
        assert_eq!(ids, vec![high_old, high_new, low]);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_priority() {
        let store = setup().await;
        seed_item(&store, 3, "2026-08-01T10:00:00+00:00").await;
        let urgent = seed_item(&store, 5, "2026-08-01T10:00:00+00:00").await;

        let filters = QueueFilters {
            status: Some(QueueStatus::Pending),
            min_priority: Some(4),
            ..Default::default()
        };
        let items = store.list(&filters, 1, 20).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item.id, urgent);
    }

    #[tokio::test]
    async fn test_list_huge_page_returns_empty() {
        let store = setup().await;
        seed_item(&store, 3, "2026-08-01T10:00:00+00:00").await;

        let items = store
            .list(&QueueFilters::default(), u32::MAX, 100)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_claim_assigns_once() {
        let store = setup().await;
        let id = seed_item(&store, 4, "2026-08-01T10:00:00+00:00").await;

        let won = store.claim(id, 77).await.unwrap();
        let item = won.unwrap();
        assert_eq!(item.status, QueueStatus::InReview);
        assert_eq!(item.assigned_to, Some(77));

        // Second moderator loses the race.
        assert!(store.claim(id, 88).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_missing_item_is_none() {
        let store = setup().await;
        assert!(store.claim(9999, 77).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_and_status_counts() {
        let store = setup().await;
        let id = seed_item(&store, 3, "2026-08-01T10:00:00+00:00").await;
        seed_item(&store, 3, "2026-08-01T10:01:00+00:00").await;

        assert!(store.resolve(id).await.unwrap());
        assert!(!store.resolve(9999).await.unwrap());

        let mut counts = store.status_counts().await.unwrap();
        counts.sort();
        assert_eq!(
            counts,
            vec![("pending".to_string(), 1), ("resolved".to_string(), 1)]
        );
    }
}
