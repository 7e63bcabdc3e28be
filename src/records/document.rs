use serde::{Deserialize, Serialize};

/// Filterable tags attached to every indexed document.
///
/// All fields are plain strings and default to empty, never absent, so
/// filters on any key always have something to compare against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub order_id: String,
    pub equipment: String,
    pub maintenance_type: String,
    pub brand: String,
}

/// Unit stored in the corpus index. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// A document paired with its distance to a query. Lower is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}
