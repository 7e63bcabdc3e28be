use thiserror::Error;

/// Failures surfaced by the retrieval-and-generation core.
#[derive(Debug, Error)]
pub enum RagError {
    /// Required source data or storage location is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Embedding or index query failed. Distinct from "no matches".
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    /// The language model invocation failed.
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    pub fn configuration<E: std::fmt::Display>(err: E) -> Self {
        RagError::Configuration(err.to_string())
    }

    pub fn retrieval<E: std::fmt::Display>(err: E) -> Self {
        RagError::Retrieval(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::Generation(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    /// Message safe to show to an end user. Internal detail belongs in the logs.
    pub fn user_message(&self) -> String {
        match self {
            RagError::Configuration(msg) => {
                format!("The assistant is not configured correctly: {}", msg)
            }
            RagError::Retrieval(_) => {
                "The repair history could not be searched right now. Please try again later."
                    .to_string()
            }
            RagError::Generation(_) => {
                "The assistant could not produce a suggestion right now. Please try again later."
                    .to_string()
            }
            RagError::Storage(_) => {
                "The conversation could not be saved or loaded. Please try again later."
                    .to_string()
            }
            RagError::InvalidInput(msg) => msg.clone(),
        }
    }
}

impl From<sqlx::Error> for RagError {
    fn from(err: sqlx::Error) -> Self {
        RagError::Storage(err.to_string())
    }
}
