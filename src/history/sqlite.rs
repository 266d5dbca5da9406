//! SQLite-backed history recorder.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use super::{title_for, HistoryRecorder};
use crate::errors::Result;
use crate::types::{Metadata, UserRef};

/// History store over a SQLite conversation/message schema
#[derive(Debug, Clone)]
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Cascade from conversation to messages requires enforcement on.
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let history = Self { pool };
        history.migrate().await?;
        Ok(history)
    }

    /// Wrap an existing pool (tests use an in-memory database).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let history = Self { pool };
        history.migrate().await?;
        Ok(history)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                sources TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id)
                    REFERENCES conversations(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count of stored conversations, used by callers reporting stats
    pub async fn conversation_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl HistoryRecorder for SqliteHistory {
    async fn record(
        &self,
        user: &UserRef,
        question: &str,
        answer: &str,
        sources: &[Metadata],
    ) -> Result<()> {
        let conversation_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let sources_json = serde_json::to_string(sources)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&conversation_id)
        .bind(&user.id)
        .bind(title_for(question))
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, sources, created_at) \
             VALUES (?, ?, 'user', ?, NULL, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&conversation_id)
        .bind(question)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, sources, created_at) \
             VALUES (?, ?, 'assistant', ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&conversation_id)
        .bind(answer)
        .bind(&sources_json)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetaValue;
    use sqlx::Row;

    async fn memory_history() -> SqliteHistory {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        // Foreign keys are off by default in SQLite.
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        SqliteHistory::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_record_writes_one_conversation_and_two_messages() {
        let history = memory_history().await;
        let user = UserRef::new("user-1");

        let mut meta = Metadata::new();
        meta.insert("source".to_string(), MetaValue::Str("doc.pdf".to_string()));

        history
            .record(&user, "What is Rust?", "A systems language.", &[meta])
            .await
            .unwrap();

        assert_eq!(history.conversation_count().await.unwrap(), 1);

        let rows = sqlx::query("SELECT role, content, sources FROM messages ORDER BY role")
            .fetch_all(&history.pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let assistant = &rows[0];
        assert_eq!(assistant.get::<String, _>("role"), "assistant");
        assert_eq!(assistant.get::<String, _>("content"), "A systems language.");
        assert!(assistant
            .get::<String, _>("sources")
            .contains("doc.pdf"));

        let user_row = &rows[1];
        assert_eq!(user_row.get::<String, _>("role"), "user");
        assert_eq!(user_row.get::<String, _>("content"), "What is Rust?");
    }

    #[tokio::test]
    async fn test_title_is_question_prefix() {
        let history = memory_history().await;
        let user = UserRef::new("user-1");
        let question = "q".repeat(80);

        history.record(&user, &question, "a", &[]).await.unwrap();

        let title: String = sqlx::query_scalar("SELECT title FROM conversations")
            .fetch_one(&history.pool)
            .await
            .unwrap();
        assert_eq!(title.len(), super::super::TITLE_LEN);
    }

    #[tokio::test]
    async fn test_open_creates_file_and_enforces_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        let history = SqliteHistory::open(&path).await.unwrap();
        assert!(path.exists());

        // open() turns foreign key enforcement on itself; deleting the
        // conversation must take its messages with it.
        let user = UserRef::new("user-1");
        history.record(&user, "q", "a", &[]).await.unwrap();
        sqlx::query("DELETE FROM conversations")
            .execute(&history.pool)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&history.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        history.pool.close().await;
    }

    #[tokio::test]
    async fn test_open_is_idempotent_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let history = SqliteHistory::open(&path).await.unwrap();
            let user = UserRef::new("user-1");
            history.record(&user, "q", "a", &[]).await.unwrap();
            history.pool.close().await;
        }

        let reopened = SqliteHistory::open(&path).await.unwrap();
        assert_eq!(reopened.conversation_count().await.unwrap(), 1);
        reopened.pool.close().await;
    }

    #[tokio::test]
    async fn test_messages_cascade_with_conversation() {
        let history = memory_history().await;
        let user = UserRef::new("user-1");

        history.record(&user, "q", "a", &[]).await.unwrap();
        sqlx::query("DELETE FROM conversations")
            .execute(&history.pool)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&history.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
