//! SQLite-backed vector store.
//!
//! Documents and their embeddings live in one SQLite file; search is a
//! brute-force cosine-distance scan, which is fine for a repair history of
//! a few thousand orders.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::VectorStore;
use crate::core::errors::RagError;
use crate::records::{Document, DocumentMetadata, ScoredDocument};

/// File name of the database inside an index directory.
pub const INDEX_FILE: &str = "corpus.db";

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Create (or open) the store inside `dir`.
    pub async fn create(dir: &Path) -> Result<Self, RagError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            RagError::Configuration(format!(
                "cannot create index directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Self::connect(dir.join(INDEX_FILE), true).await
    }

    /// Open an existing store inside `dir`.
    pub async fn open(dir: &Path) -> Result<Self, RagError> {
        Self::connect(dir.join(INDEX_FILE), false).await
    }

    async fn connect(db_path: PathBuf, create: bool) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                RagError::Configuration(format!(
                    "cannot open index {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS corpus_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<DocumentMetadata>(&metadata_str).unwrap_or_default();

        Document {
            id: row.get("doc_id"),
            content: row.get("content"),
            metadata,
        }
    }
}

/// `1 - cosine_similarity`; 0 for identical direction, 2 for opposite.
/// Mismatched or zero vectors get the neutral distance 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        1.0
    } else {
        1.0 - dot / denom
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(&self, items: Vec<(Document, Vec<f32>)>) -> Result<(), RagError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (doc, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = serde_json::to_string(&doc.metadata).map_err(RagError::storage)?;

            sqlx::query(
                "INSERT OR REPLACE INTO documents (doc_id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&doc.id)
            .bind(&doc.content)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT doc_id, content, metadata, embedding
             FROM documents
             ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::retrieval)?;

        let mut scored: Vec<ScoredDocument> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                ScoredDocument {
                    document: Self::row_to_document(row),
                    score: cosine_distance(query_embedding, &stored),
                }
            })
            .collect();

        // stable: equal distances keep insertion order
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>, RagError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM corpus_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), RagError> {
        sqlx::query(
            "INSERT OR REPLACE INTO corpus_meta (key, value, updated_at)
             VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
