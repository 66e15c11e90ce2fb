// SQLite-backed conversation store.
//
// Conversation and membership management belong to another part of the
// platform; this store carries just enough of both for the pipeline's
// participant checks and for running the service standalone.
//
// Tables:
// - conversations: id, active flag, last message timestamp
// - conversation_participants: membership rows

use crate::core::messaging::{Conversation, ConversationStore, MessagingError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteConversationStore {
    pool: Pool<Sqlite>,
}

impl SqliteConversationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), MessagingError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_message_at TEXT
            );
            CREATE TABLE IF NOT EXISTS conversation_participants (
                conversation_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                PRIMARY KEY (conversation_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        Ok(())
    }

    /// Create a conversation with its initial participants. Used by the
    /// demo seed and tests; production rows arrive via the platform's
    /// conversation service writing to the same database.
    pub async fn create_conversation(
        &self,
        title: Option<&str>,
        participants: &[i64],
    ) -> Result<Conversation, MessagingError> {
        let result = sqlx::query("INSERT INTO conversations (title, is_active) VALUES (?, 1)")
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        let id = result.last_insert_rowid();

        for user_id in participants {
            sqlx::query(
                "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;
        }

        Ok(Conversation {
            id,
            title: title.map(|t| t.to_string()),
            is_active: true,
            last_message_at: None,
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn find(&self, conversation_id: i64) -> Result<Option<Conversation>, MessagingError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        Ok(row.map(|row| {
            let last_str: Option<String> = row.get("last_message_at");
            Conversation {
                id: row.get("id"),
                title: row.get("title"),
                is_active: row.get("is_active"),
                last_message_at: last_str.and_then(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .ok()
                }),
            }
        }))
    }

    async fn is_participant(
        &self,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<bool, MessagingError> {
        let row = sqlx::query(
            "SELECT 1 FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::StorageError(e.to_string()))?;

        Ok(row.is_some())
    }
}
