use std::sync::Arc;

use super::index::CorpusIndex;
use crate::core::config::RetrievalSettings;
use crate::core::errors::RagError;
use crate::records::{Document, ScoredDocument};

/// Composite search string for an (equipment, fault) pair.
pub fn search_query(equipment: &str, fault_text: &str) -> String {
    format!("Fault in equipment {}: {}", equipment, fault_text)
}

/// Stable ascending sort by score, truncated to `k_final`.
///
/// Backends do not all guarantee globally ordered nearest-neighbour output,
/// so the ranking is re-imposed here.
pub fn rerank(mut candidates: Vec<ScoredDocument>, k_final: usize) -> Vec<ScoredDocument> {
    candidates.sort_by(|a, b| a.score.total_cmp(&b.score));
    candidates.truncate(k_final);
    candidates
}

/// Over-fetches `k_search` candidates and keeps the best `k_final`.
pub struct Retriever {
    index: Arc<CorpusIndex>,
    k_search: usize,
    k_final: usize,
}

impl Retriever {
    pub fn new(index: Arc<CorpusIndex>, settings: &RetrievalSettings) -> Self {
        Self {
            index,
            k_search: settings.k_search,
            k_final: settings.k_final.min(settings.k_search),
        }
    }

    pub async fn retrieve_scored(
        &self,
        equipment: &str,
        fault_text: &str,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let query = search_query(equipment.trim(), fault_text.trim());
        let candidates = self.index.similarity_search(&query, self.k_search).await?;
        let fetched = candidates.len();
        let ranked = rerank(candidates, self.k_final);

        tracing::debug!(
            "Retrieved {} of {} candidates for '{}'",
            ranked.len(),
            fetched,
            query
        );
        Ok(ranked)
    }

    /// Top documents for the pair. An empty corpus gives an empty list.
    pub async fn retrieve(
        &self,
        equipment: &str,
        fault_text: &str,
    ) -> Result<Vec<Document>, RagError> {
        Ok(self
            .retrieve_scored(equipment, fault_text)
            .await?
            .into_iter()
            .map(|scored| scored.document)
            .collect())
    }
}
