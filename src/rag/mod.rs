//! Retrieval side of the assistant.
//!
//! - `CorpusIndex`: builds the embedding index once and reloads it afterwards
//! - `Retriever`: turns an (equipment, fault) pair into ranked documents

mod index;
mod retriever;
mod sqlite;
mod store;

pub use index::{is_built, CorpusIndex, IndexOutcome};
pub use retriever::{rerank, search_query, Retriever};
pub use sqlite::{cosine_distance, SqliteVectorStore};
pub use store::VectorStore;
