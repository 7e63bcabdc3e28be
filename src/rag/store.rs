//! VectorStore trait — abstract interface for corpus storage backends.

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::records::{Document, ScoredDocument};

/// Storage for document vectors.
///
/// Implementations must return search results ordered by ascending
/// distance, keeping insertion order between equal distances.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert documents with their embedding vectors in one transaction.
    async fn insert_batch(&self, items: Vec<(Document, Vec<f32>)>) -> Result<(), RagError>;

    /// Up to `limit` documents nearest to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RagError>;

    async fn count(&self) -> Result<usize, RagError>;

    async fn get_meta(&self, key: &str) -> Result<Option<String>, RagError>;

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), RagError>;

    /// Release connections. The store is unusable afterwards.
    async fn close(&self);
}
