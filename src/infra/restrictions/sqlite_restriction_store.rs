// SQLite-backed restriction store.
//
// Tables:
// - user_restrictions: Append-only restriction ledger, lazily expired.

use crate::core::restrictions::{
    NewRestriction, RestrictionError, RestrictionStore, RestrictionType, UserRestriction,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteRestrictionStore {
    pool: Pool<Sqlite>,
}

impl SqliteRestrictionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), RestrictionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_restrictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                restriction_type TEXT NOT NULL,
                reason TEXT NOT NULL,
                restricted_until TEXT,
                is_permanent INTEGER NOT NULL DEFAULT 0,
                applied_by INTEGER,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_user_restrictions_user
                ON user_restrictions(user_id, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RestrictionError::StorageError(e.to_string()))?;
        Ok(())
    }
}

pub(crate) fn restriction_type_from_db(value: &str) -> RestrictionType {
    match value {
        "temporary_mute" => RestrictionType::TemporaryMute,
        "banned" => RestrictionType::Banned,
        _ => RestrictionType::BehaviorWarning,
    }
}

pub(crate) fn row_to_restriction(row: &sqlx::sqlite::SqliteRow) -> UserRestriction {
    let type_str: String = row.get("restriction_type");
    let until_str: Option<String> = row.get("restricted_until");
    let created_at_str: String = row.get("created_at");
    UserRestriction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        restriction_type: restriction_type_from_db(&type_str),
        reason: row.get("reason"),
        restricted_until: until_str.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        }),
        is_permanent: row.get("is_permanent"),
        applied_by: row.get("applied_by"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[async_trait]
impl RestrictionStore for SqliteRestrictionStore {
    async fn insert(
        &self,
        restriction: NewRestriction,
    ) -> Result<UserRestriction, RestrictionError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_restrictions
                (user_id, restriction_type, reason, restricted_until, is_permanent, applied_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(restriction.user_id)
        .bind(restriction.restriction_type.to_string())
        .bind(&restriction.reason)
        .bind(restriction.restricted_until.map(|t| t.to_rfc3339()))
        .bind(restriction.is_permanent)
        .bind(restriction.applied_by)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RestrictionError::StorageError(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM user_restrictions WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RestrictionError::StorageError(e.to_string()))?;

        Ok(row_to_restriction(&row))
    }

    async fn for_user(&self, user_id: i64) -> Result<Vec<UserRestriction>, RestrictionError> {
        let rows = sqlx::query(
            "SELECT * FROM user_restrictions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RestrictionError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(row_to_restriction).collect())
    }
}
