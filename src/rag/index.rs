//! Corpus index: one-time load-or-build of the persisted vector store and
//! similarity queries against it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::sqlite::SqliteVectorStore;
use super::store::VectorStore;
use crate::core::config::CorpusSettings;
use crate::core::errors::RagError;
use crate::llm::LlmProvider;
use crate::records::{Document, DocumentSource, ScoredDocument};

const META_EMBEDDING_MODEL: &str = "embedding_model";
const META_DOCUMENT_COUNT: &str = "document_count";
const META_SOURCE_FINGERPRINT: &str = "source_sha256";
const META_BUILT_AT: &str = "built_at";

/// How the index came to be available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Existing index opened; no embeddings computed.
    Loaded { documents: usize },
    /// Index built from the document source during this call.
    Built {
        documents: usize,
        embedding_calls: usize,
    },
}

impl IndexOutcome {
    pub fn documents(&self) -> usize {
        match self {
            IndexOutcome::Loaded { documents } | IndexOutcome::Built { documents, .. } => {
                *documents
            }
        }
    }

    pub fn embedding_calls(&self) -> usize {
        match self {
            IndexOutcome::Loaded { .. } => 0,
            IndexOutcome::Built {
                embedding_calls, ..
            } => *embedding_calls,
        }
    }
}

/// Any content at the index location means the index is built. Nothing
/// about that content is validated.
pub fn is_built(index_dir: &Path) -> bool {
    if index_dir.is_file() {
        return true;
    }
    fs::read_dir(index_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn staging_dir(index_dir: &Path) -> PathBuf {
    let name = index_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    index_dir.with_file_name(format!("{}.building", name))
}

pub struct CorpusIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn LlmProvider>,
    embedding_model: String,
    outcome: IndexOutcome,
}

impl CorpusIndex {
    /// Opens the index at `settings.index_dir` if anything is there,
    /// otherwise builds it from `source` and persists it.
    ///
    /// The source is not touched when an index already exists. There is no
    /// incremental path: rebuilding means deleting the index directory.
    pub async fn load_or_build(
        settings: &CorpusSettings,
        embedding_model: &str,
        embedder: Arc<dyn LlmProvider>,
        source: &dyn DocumentSource,
    ) -> Result<Self, RagError> {
        let index_dir = settings.index_dir.as_path();

        let (store, outcome) = if is_built(index_dir) {
            Self::load(index_dir, embedding_model).await?
        } else {
            Self::build(settings, embedding_model, embedder.as_ref(), source).await?
        };

        Ok(Self {
            store: Arc::new(store),
            embedder,
            embedding_model: embedding_model.to_string(),
            outcome,
        })
    }

    async fn load(
        index_dir: &Path,
        embedding_model: &str,
    ) -> Result<(SqliteVectorStore, IndexOutcome), RagError> {
        tracing::info!("Loading existing corpus index from {}", index_dir.display());
        let store = SqliteVectorStore::open(index_dir).await?;

        if let Some(built_with) = store.get_meta(META_EMBEDDING_MODEL).await? {
            if built_with != embedding_model {
                tracing::warn!(
                    "Corpus index was built with embedding model '{}' but '{}' is configured; delete {} to rebuild",
                    built_with,
                    embedding_model,
                    index_dir.display()
                );
            }
        }

        let documents = store.count().await?;
        tracing::info!("Corpus index loaded: {} documents", documents);
        Ok((store, IndexOutcome::Loaded { documents }))
    }

    async fn build(
        settings: &CorpusSettings,
        embedding_model: &str,
        embedder: &dyn LlmProvider,
        source: &dyn DocumentSource,
    ) -> Result<(SqliteVectorStore, IndexOutcome), RagError> {
        let index_dir = settings.index_dir.as_path();
        tracing::info!("No corpus index at {}; building", index_dir.display());

        let documents = source.documents()?;
        let fingerprint = source.fingerprint();

        let staging = staging_dir(index_dir);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| {
                RagError::Configuration(format!(
                    "cannot clear stale build directory {}: {}",
                    staging.display(),
                    e
                ))
            })?;
        }

        let built = Self::populate(
            &staging,
            settings.embed_batch_size,
            embedding_model,
            embedder,
            documents,
            fingerprint,
        )
        .await;

        let (document_count, embedding_calls) = match built {
            Ok(counts) => counts,
            Err(err) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(err);
            }
        };

        // An empty directory left at the index location does not count as
        // built; make room for the rename.
        if index_dir.is_dir() {
            let _ = fs::remove_dir(index_dir);
        }
        fs::rename(&staging, index_dir).map_err(|e| {
            RagError::Configuration(format!(
                "cannot move built index into {}: {}",
                index_dir.display(),
                e
            ))
        })?;

        let store = SqliteVectorStore::open(index_dir).await?;
        tracing::info!(
            "Corpus index built: {} documents, {} embedding calls",
            document_count,
            embedding_calls
        );

        Ok((
            store,
            IndexOutcome::Built {
                documents: document_count,
                embedding_calls,
            },
        ))
    }

    async fn populate(
        staging: &Path,
        batch_size: usize,
        embedding_model: &str,
        embedder: &dyn LlmProvider,
        documents: Vec<Document>,
        fingerprint: Option<String>,
    ) -> Result<(usize, usize), RagError> {
        if let Some(parent) = staging.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RagError::Configuration(format!(
                    "cannot create index parent directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let store = SqliteVectorStore::create(staging).await?;
        let total = documents.len();
        let mut embedding_calls = 0usize;

        for batch in documents.chunks(batch_size.max(1)) {
            let inputs: Vec<String> = batch.iter().map(|doc| doc.content.clone()).collect();
            tracing::debug!("Embedding {} documents", inputs.len());

            let vectors = embedder
                .embed(&inputs, embedding_model)
                .await
                .map_err(|e| RagError::Retrieval(format!("failed to embed corpus: {}", e)))?;
            embedding_calls += 1;

            if vectors.len() != batch.len() {
                return Err(RagError::Retrieval(format!(
                    "embedding service returned {} vectors for {} documents",
                    vectors.len(),
                    batch.len()
                )));
            }

            store
                .insert_batch(batch.iter().cloned().zip(vectors).collect())
                .await?;
        }

        store.set_meta(META_EMBEDDING_MODEL, embedding_model).await?;
        store
            .set_meta(META_DOCUMENT_COUNT, &total.to_string())
            .await?;
        if let Some(fingerprint) = fingerprint {
            store.set_meta(META_SOURCE_FINGERPRINT, &fingerprint).await?;
        }
        store
            .set_meta(META_BUILT_AT, &chrono::Utc::now().to_rfc3339())
            .await?;
        store.close().await;

        Ok((total, embedding_calls))
    }

    pub fn outcome(&self) -> IndexOutcome {
        self.outcome
    }

    pub async fn len(&self) -> Result<usize, RagError> {
        self.store.count().await
    }

    /// Up to `k` documents nearest to `query_text`, lower score first.
    /// Returns fewer than `k` when the corpus is smaller.
    pub async fn similarity_search(
        &self,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let mut vectors = self
            .embedder
            .embed(&[query_text.to_string()], &self.embedding_model)
            .await
            .map_err(|e| RagError::Retrieval(format!("failed to embed query: {}", e)))?;

        let query_embedding = vectors
            .pop()
            .ok_or_else(|| RagError::Retrieval("embedding service returned no vector".into()))?;

        let results = self
            .store
            .search(&query_embedding, k)
            .await
            .map_err(|e| match e {
                RagError::Retrieval(_) => e,
                other => RagError::Retrieval(other.to_string()),
            })?;
        tracing::debug!("similarity_search k={} -> {} results", k, results.len());
        Ok(results)
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}
