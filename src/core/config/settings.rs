use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::records::ColumnMap;

/// Typed application settings, deserialized from `config.yml`.
///
/// Every section has defaults so an empty file (or no file) still yields a
/// usable configuration apart from the API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub corpus: CorpusSettings,
    pub retrieval: RetrievalSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// CSV file with the cleaned repair history.
    pub source_path: PathBuf,
    /// Directory holding the persisted vector index.
    pub index_dir: PathBuf,
    pub embed_batch_size: usize,
    pub columns: ColumnMap,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/resultado_sem_duplicatas.csv"),
            index_dir: PathBuf::from("index/repair_history"),
            embed_batch_size: 64,
            columns: ColumnMap::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Candidates fetched from the index before re-ranking.
    pub k_search: usize,
    /// Documents kept after re-ranking.
    pub k_final: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k_search: 10,
            k_final: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub db_path: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/conversations.db"),
        }
    }
}

impl Settings {
    /// Resolves relative filesystem paths against `root`.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        self.corpus.source_path = resolve(root, &self.corpus.source_path);
        self.corpus.index_dir = resolve(root, &self.corpus.index_dir);
        self.history.db_path = resolve(root, &self.history.db_path);
        self
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
