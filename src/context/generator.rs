use std::sync::Arc;

use super::prompt::build_messages;
use crate::core::errors::RagError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::records::Document;

/// Sampling is deterministic for every answer.
pub const TEMPERATURE: f32 = 0.0;

/// Composes the grounded prompt and makes the single model call.
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
}

impl Generator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the model's raw text. Failures are not retried.
    pub async fn generate(
        &self,
        question: &str,
        equipment: &str,
        context: &[Document],
        history: &[ChatMessage],
    ) -> Result<String, RagError> {
        let request = ChatRequest::new(build_messages(question, equipment, context, history))
            .with_temperature(TEMPERATURE)
            .with_max_tokens(self.max_tokens);

        tracing::debug!(
            "Generating with {} ({} context documents, {} history turns)",
            self.model,
            context.len(),
            history.len()
        );

        self.provider
            .chat(request, &self.model)
            .await
            .map_err(RagError::generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::prompt::NO_SOLUTION_PHRASE;
    use crate::test_support::{sample_corpus, ChatScript, MockProvider};

    #[tokio::test]
    async fn request_uses_zero_temperature_and_configured_cap() {
        let provider = Arc::new(MockProvider::with_script(ChatScript::Fixed("ok".into())));
        let generator = Generator::new(provider.clone(), "chat-model", 321);

        let answer = generator
            .generate("noise", "Bike", &[], &[])
            .await
            .unwrap();

        assert_eq!(answer, "ok");
        let request = provider.last_request().unwrap();
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(321));
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn empty_context_still_calls_the_model() {
        let provider = Arc::new(MockProvider::new());
        let generator = Generator::new(provider.clone(), "chat-model", 1000);

        let answer = generator
            .generate("belt slipping", "Treadmill X9000", &[], &[])
            .await
            .unwrap();

        assert_eq!(provider.chat_calls(), 1);
        assert_eq!(answer, NO_SOLUTION_PHRASE);
    }

    #[tokio::test]
    async fn grounded_answer_references_context() {
        let provider = Arc::new(MockProvider::new());
        let generator = Generator::new(provider, "chat-model", 1000);
        let corpus = sample_corpus();

        let answer = generator
            .generate("belt slipping", "Treadmill X9000", &corpus, &[])
            .await
            .unwrap();

        assert!(answer.contains("Replaced drive belt"));
    }

    #[tokio::test]
    async fn provider_failure_is_a_generation_error() {
        let provider = Arc::new(MockProvider::with_script(ChatScript::Fail("down".into())));
        let generator = Generator::new(provider.clone(), "chat-model", 1000);

        let err = generator
            .generate("noise", "Bike", &[], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Generation(_)));
        assert_eq!(provider.chat_calls(), 1);
    }
}
