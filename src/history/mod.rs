use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::core::errors::RagError;
use crate::llm::ChatMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub name: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: String,
    pub updated_at: String,
}

/// Conversation transcripts keyed by a monotonically increasing integer id.
#[derive(Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    pub async fn open(db_path: &Path) -> Result<Self, RagError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Storage(format!(
                    "cannot create directory for {}: {}",
                    db_path.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RagError::Storage(format!("Failed to connect to history db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                messages JSON NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| RagError::Storage(format!("Failed to init conversations table: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn insert(&self, name: &str, messages: &[ChatMessage]) -> Result<i64, RagError> {
        let now = chrono::Utc::now().to_rfc3339();
        let payload = serde_json::to_string(messages).map_err(RagError::storage)?;

        let result = sqlx::query(
            "INSERT INTO conversations (name, messages, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(&payload)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(
        &self,
        id: i64,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<(), RagError> {
        let now = chrono::Utc::now().to_rfc3339();
        let payload = serde_json::to_string(messages).map_err(RagError::storage)?;

        let result = sqlx::query(
            "UPDATE conversations SET name = ?, messages = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(&payload)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RagError::Storage(format!("conversation {} not found", id)));
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Conversation>, RagError> {
        let row = sqlx::query(
            "SELECT id, name, messages, created_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_conversation).transpose()
    }

    /// Every conversation with its transcript, most recent first.
    pub async fn list(&self) -> Result<Vec<Conversation>, RagError> {
        let rows = sqlx::query(
            "SELECT id, name, messages, created_at, updated_at
             FROM conversations
             ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_conversation).collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_conversation(row: &SqliteRow) -> Result<Conversation, RagError> {
    let id: i64 = row.try_get("id")?;
    let payload: String = row.try_get("messages")?;
    let messages: Vec<ChatMessage> = serde_json::from_str(&payload).map_err(|e| {
        RagError::Storage(format!("conversation {} has a corrupt transcript: {}", id, e))
    })?;

    Ok(Conversation {
        id,
        name: row.try_get("name")?,
        messages,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
