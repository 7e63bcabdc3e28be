pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, ProviderError};
pub use types::{ChatMessage, ChatRequest, Role};
