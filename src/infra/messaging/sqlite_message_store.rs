// SQLite-backed message store.
//
// Tables:
// - messages: Message rows with their safety verdict baked in
// - safety_logs: One row per distinct violation per message
//
// commit_send also writes into moderation_queue, user_restrictions and
// conversations - the whole send write-set is one transaction here, which
// is what makes the pipeline all-or-nothing.

use crate::core::messaging::{Message, MessageStore, MessagingError, ModerationStatus, SendRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub struct SqliteMessageStore {
    pool: Pool<Sqlite>,
}

impl SqliteMessageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), MessagingError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                sender_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                message_type TEXT NOT NULL DEFAULT 'text',
                safety_score INTEGER NOT NULL DEFAULT 100,
                flagged_terms TEXT NOT NULL DEFAULT '[]',
                is_blocked INTEGER NOT NULL DEFAULT 0,
                moderation_status TEXT NOT NULL DEFAULT 'pending',
                parent_message_id INTEGER,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, created_at);
            CREATE TABLE IF NOT EXISTS safety_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                violation_type TEXT NOT NULL,
                severity_level INTEGER NOT NULL,
                flagged_terms TEXT NOT NULL DEFAULT '[]',
                action_taken TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_safety_logs_created
                ON safety_logs(created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        Ok(())
    }
}

pub(crate) fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Message {
    let status_str: String = row.get("moderation_status");
    let terms_json: String = row.get("flagged_terms");
    let created_at_str: String = row.get("created_at");
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        message_type: row.get("message_type"),
        safety_score: row.get("safety_score"),
        flagged_terms: serde_json::from_str(&terms_json).unwrap_or_default(),
        is_blocked: row.get("is_blocked"),
        moderation_status: ModerationStatus::from_str(&status_str)
            .unwrap_or(ModerationStatus::Pending),
        parent_message_id: row.get("parent_message_id"),
        is_deleted: row.get("is_deleted"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn commit_send(&self, record: SendRecord) -> Result<Message, MessagingError> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let m = &record.message;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        let flagged_terms_json = serde_json::to_string(&m.flagged_terms)
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        let result = sqlx::query(
            r#"
            INSERT INTO messages
                (conversation_id, sender_id, content, message_type, safety_score,
                 flagged_terms, is_blocked, moderation_status, parent_message_id,
                 is_deleted, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(m.conversation_id)
        .bind(m.sender_id)
        .bind(&m.content)
        .bind(&m.message_type)
        .bind(m.safety_score)
        .bind(&flagged_terms_json)
        .bind(m.is_blocked)
        .bind(m.moderation_status.to_string())
        .bind(m.parent_message_id)
        .bind(&now_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        let message_id = result.last_insert_rowid();

        for log in &record.safety_logs {
            let terms_json = serde_json::to_string(&log.flagged_terms)
                .map_err(|e| MessagingError::StorageError(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO safety_logs
                    (message_id, user_id, violation_type, severity_level, flagged_terms,
                     action_taken, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(message_id)
            .bind(log.user_id)
            .bind(&log.violation_type)
            .bind(log.severity_level)
            .bind(&terms_json)
            .bind(&log.action_taken)
            .bind(&now_str)
            .execute(&mut *tx)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        }

        if let Some(flag) = &record.review_flag {
            let types_json = serde_json::to_string(&flag.violation_types)
                .map_err(|e| MessagingError::StorageError(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO moderation_queue
                    (item_type, item_id, priority, violation_types, status, created_at)
                VALUES ('message', ?, ?, ?, 'pending', ?)
                "#,
            )
            .bind(message_id)
            .bind(flag.priority)
            .bind(&types_json)
            .bind(&now_str)
            .execute(&mut *tx)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        }

        sqlx::query("UPDATE conversations SET last_message_at = ? WHERE id = ?")
            .bind(&now_str)
            .bind(m.conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        if let Some(restriction) = &record.auto_restriction {
            sqlx::query(
                r#"
                INSERT INTO user_restrictions
                    (user_id, restriction_type, reason, restricted_until, is_permanent,
                     applied_by, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(restriction.user_id)
            .bind(restriction.restriction_type.to_string())
            .bind(&restriction.reason)
            .bind(restriction.restricted_until.map(|t| t.to_rfc3339()))
            .bind(restriction.is_permanent)
            .bind(restriction.applied_by)
            .bind(&now_str)
            .execute(&mut *tx)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        Ok(Message {
            id: message_id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            content: m.content.clone(),
            message_type: m.message_type.clone(),
            safety_score: m.safety_score,
            flagged_terms: m.flagged_terms.clone(),
            is_blocked: m.is_blocked,
            moderation_status: m.moderation_status,
            parent_message_id: m.parent_message_id,
            is_deleted: false,
            created_at: now,
        })
    }

    async fn list_for_conversation(
        &self,
        conversation_id: i64,
        viewer_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, MessagingError> {
        // i64 math: page and limit are caller-controlled.
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ?
              AND is_deleted = 0
              AND (is_blocked = 0 OR sender_id = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(conversation_id)
        .bind(viewer_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    async fn violation_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, MessagingError> {
        let rows = sqlx::query(
            r#"
            SELECT violation_type, COUNT(*) AS total
            FROM safety_logs
            WHERE created_at >= ?
            GROUP BY violation_type
            ORDER BY total DESC
            "#,
        )
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("violation_type"), row.get("total")))
            .collect())
    }

    async fn blocked_count_since(&self, since: DateTime<Utc>) -> Result<i64, MessagingError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM messages WHERE is_blocked = 1 AND created_at >= ?",
        )
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        Ok(row.get("total"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
