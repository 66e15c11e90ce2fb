// SQLite-backed moderation action store.
//
// Tables:
// - moderation_actions: Append-only audit of executed decisions
//
// commit_action also writes into messages, user_restrictions and
// moderation_queue - audit row, side effect and queue resolution land in
// one transaction or not at all.

use crate::core::actions::{
    ActionEffect, ActionError, ActionRecord, ActionStore, ModerationAction,
};
use crate::core::messaging::Message;
use crate::infra::messaging::sqlite_message_store::row_to_message;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

pub struct SqliteActionStore {
    pool: Pool<Sqlite>,
}

impl SqliteActionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ActionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                moderator_id INTEGER NOT NULL,
                target_type TEXT NOT NULL,
                target_id INTEGER NOT NULL,
                action_type TEXT NOT NULL,
                reason TEXT NOT NULL,
                duration_hours INTEGER,
                notes TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ActionError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ActionStore for SqliteActionStore {
    async fn find_message(&self, message_id: i64) -> Result<Option<Message>, ActionError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ? AND is_deleted = 0")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ActionError::StorageError(e.to_string()))?;

        Ok(row.map(|r| row_to_message(&r)))
    }

    async fn commit_action(&self, record: ActionRecord) -> Result<ModerationAction, ActionError> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ActionError::StorageError(e.to_string()))?;

        // 1. Audit row first.
        let result = sqlx::query(
            r#"
            INSERT INTO moderation_actions
                (moderator_id, target_type, target_id, action_type, reason,
                 duration_hours, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.moderator_id)
        .bind(record.target_type.to_string())
        .bind(record.target_id)
        .bind(record.action_type.to_string())
        .bind(&record.reason)
        .bind(record.duration_hours)
        .bind(&record.notes)
        .bind(&now_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| ActionError::StorageError(e.to_string()))?;
        let action_id = result.last_insert_rowid();

        // 2. The effect.
        match &record.effect {
            ActionEffect::SoftDeleteMessage { message_id } => {
                let res = sqlx::query("UPDATE messages SET is_deleted = 1 WHERE id = ?")
                    .bind(message_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| ActionError::StorageError(e.to_string()))?;
                if res.rows_affected() == 0 {
                    return Err(ActionError::NotFound("message"));
                }
            }
            ActionEffect::ApproveMessage { message_id } => {
                // pending|flagged -> approved is the only legal transition;
                // a blocked message stays blocked.
                let res = sqlx::query(
                    r#"
                    UPDATE messages SET moderation_status = 'approved'
                    WHERE id = ? AND moderation_status IN ('pending', 'flagged')
                    "#,
                )
                .bind(message_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| ActionError::StorageError(e.to_string()))?;
                if res.rows_affected() == 0 {
                    return Err(ActionError::Validation(
                        "only pending or flagged messages can be approved".into(),
                    ));
                }
            }
            ActionEffect::Restrict(restriction) => {
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
                .bind(record.moderator_id)
                .bind(&now_str)
                .execute(&mut *tx)
                .await
                .map_err(|e| ActionError::StorageError(e.to_string()))?;
            }
        }

        // 3. Resolve the originating queue item, if the decision came off
        //    the queue.
        if let Some(queue_item_id) = record.queue_item_id {
            let res = sqlx::query("UPDATE moderation_queue SET status = 'resolved' WHERE id = ?")
                .bind(queue_item_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| ActionError::StorageError(e.to_string()))?;
            if res.rows_affected() == 0 {
                return Err(ActionError::NotFound("queue item"));
            }
        }

        tx.commit()
            .await
            .map_err(|e| ActionError::StorageError(e.to_string()))?;

        Ok(ModerationAction {
            id: action_id,
            moderator_id: record.moderator_id,
            target_type: record.target_type,
            target_id: record.target_id,
            action_type: record.action_type,
            reason: record.reason,
            duration_hours: record.duration_hours,
            notes: record.notes,
            created_at: now,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
