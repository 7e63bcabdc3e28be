use thiserror::Error;

use crate::core::errors::RagError;
use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] RagError),

    #[error("Failed to initialize LLM provider: {0}")]
    Provider(#[source] ProviderError),

    #[error("Failed to load or build corpus index: {0}")]
    Corpus(#[source] RagError),

    #[error("Failed to build pipeline: {0}")]
    Pipeline(#[source] RagError),

    #[error("Failed to initialize conversation store: {0}")]
    History(#[source] RagError),
}

impl InitializationError {
    /// Operator-facing text. Configuration problems are shown as-is so a
    /// missing data file can be fixed without reading the logs.
    pub fn user_message(&self) -> String {
        match self {
            InitializationError::Config(err)
            | InitializationError::Corpus(err)
            | InitializationError::Pipeline(err)
            | InitializationError::History(err) => err.user_message(),
            InitializationError::Provider(_) => {
                "The language model service could not be set up. Check the LLM settings."
                    .to_string()
            }
        }
    }
}
