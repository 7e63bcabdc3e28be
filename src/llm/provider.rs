use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("unexpected response from {provider}: {message}")]
    Payload { provider: String, message: String },
    #[error("{0}")]
    Unavailable(String),
}

/// Boundary to the embedding service and the chat model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name used in logs
    fn name(&self) -> &str;

    /// chat completion (non-streaming), returns the raw answer text
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ProviderError>;

    /// one fixed-dimension vector per input, same order
    async fn embed(&self, inputs: &[String], model_id: &str)
        -> Result<Vec<Vec<f32>>, ProviderError>;
}
