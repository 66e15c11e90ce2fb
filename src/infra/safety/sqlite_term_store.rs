// SQLite-backed flagged-term store.
//
// Tables:
// - flagged_terms: The mutable moderation rule set, unique by term.

use crate::core::safety::{FlaggedTerm, FlaggedTermStore, NewFlaggedTerm, SafetyError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTermStore {
    pool: Pool<Sqlite>,
}

impl SqliteTermStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), SafetyError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flagged_terms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                term TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                severity INTEGER NOT NULL,
                is_regex INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SafetyError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn row_to_term(row: &sqlx::sqlite::SqliteRow) -> FlaggedTerm {
    let created_at_str: String = row.get("created_at");
    FlaggedTerm {
        id: row.get("id"),
        term: row.get("term"),
        category: row.get("category"),
        severity: row.get("severity"),
        is_regex: row.get("is_regex"),
        is_active: row.get("is_active"),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[async_trait]
impl FlaggedTermStore for SqliteTermStore {
    async fn active_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError> {
        let rows = sqlx::query("SELECT * FROM flagged_terms WHERE is_active = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SafetyError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(row_to_term).collect())
    }

    async fn upsert_term(&self, rule: NewFlaggedTerm) -> Result<FlaggedTerm, SafetyError> {
        sqlx::query(
            r#"
            INSERT INTO flagged_terms (term, category, severity, is_regex, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT(term) DO UPDATE SET
                category = excluded.category,
                severity = excluded.severity,
                is_regex = excluded.is_regex,
                is_active = 1
            "#,
        )
        .bind(&rule.term)
        .bind(&rule.category)
        .bind(rule.severity)
        .bind(rule.is_regex)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SafetyError::StorageError(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM flagged_terms WHERE term = ?")
            .bind(&rule.term)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SafetyError::StorageError(e.to_string()))?;

        Ok(row_to_term(&row))
    }

    async fn list_terms(&self) -> Result<Vec<FlaggedTerm>, SafetyError> {
        let rows = sqlx::query("SELECT * FROM flagged_terms ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SafetyError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(row_to_term).collect())
    }
}
