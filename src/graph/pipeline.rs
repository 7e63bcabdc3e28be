use super::builder::build_pipeline_graph;
use super::node::NodeContext;
use super::runtime::GraphRuntime;
use super::state::{PipelineInput, PipelineState};
use crate::context::Generator;
use crate::core::errors::RagError;
use crate::llm::ChatMessage;
use crate::rag::Retriever;

/// Retrieve-then-generate over one shared, read-only corpus.
///
/// Each call owns its own state, so concurrent invocations do not interact.
pub struct RagPipeline {
    graph: GraphRuntime,
    retriever: Retriever,
    generator: Generator,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Generator) -> Result<Self, RagError> {
        Ok(Self {
            graph: build_pipeline_graph()?,
            retriever,
            generator,
        })
    }

    pub async fn invoke(&self, input: PipelineInput) -> Result<PipelineState, RagError> {
        let ctx = NodeContext {
            retriever: &self.retriever,
            generator: &self.generator,
        };
        let state = self.graph.run(PipelineState::from(input), &ctx).await?;
        Ok(state)
    }

    /// Runs the pipeline and extracts the answer text.
    pub async fn answer(
        &self,
        question: &str,
        equipment: &str,
        chat_history: &[ChatMessage],
    ) -> Result<String, RagError> {
        let state = self
            .invoke(PipelineInput::new(question, equipment, chat_history.to_vec()))
            .await?;
        state
            .answer
            .ok_or_else(|| RagError::Generation("pipeline finished without an answer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::context::NO_SOLUTION_PHRASE;
    use crate::core::config::{CorpusSettings, RetrievalSettings};
    use crate::llm::LlmProvider;
    use crate::rag::CorpusIndex;
    use crate::test_support::{sample_corpus, ChatScript, MockProvider};

    async fn pipeline_with(
        dir: &std::path::Path,
        query_provider: Arc<dyn LlmProvider>,
    ) -> RagPipeline {
        let settings = CorpusSettings {
            index_dir: dir.join("index"),
            ..CorpusSettings::default()
        };
        let built = CorpusIndex::load_or_build(
            &settings,
            "embed",
            Arc::new(MockProvider::new()),
            &sample_corpus(),
        )
        .await
        .unwrap();
        built.close().await;

        let index = CorpusIndex::load_or_build(
            &settings,
            "embed",
            query_provider.clone(),
            &sample_corpus(),
        )
        .await
        .unwrap();
        RagPipeline::new(
            Retriever::new(Arc::new(index), &RetrievalSettings::default()),
            Generator::new(query_provider, "chat", 1000),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn invoke_fills_context_then_answer() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(tmp.path(), Arc::new(MockProvider::new())).await;

        let state = pipeline
            .invoke(PipelineInput::new("belt slipping", "Treadmill X9000", Vec::new()))
            .await
            .unwrap();

        let context = state.context.as_ref().unwrap();
        assert!(!context.is_empty() && context.len() <= 4);
        assert!(context
            .iter()
            .any(|d| d.metadata.equipment == "Treadmill X9000"));
        assert!(state.answer.unwrap().contains("Replaced drive belt"));
    }

    #[tokio::test]
    async fn unknown_equipment_gets_no_solution_phrase() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(tmp.path(), Arc::new(MockProvider::new())).await;

        let answer = pipeline
            .answer("sparks from the motor", "Forklift F1", &[])
            .await
            .unwrap();
        assert_eq!(answer, NO_SOLUTION_PHRASE);
    }

    #[tokio::test]
    async fn caller_history_is_left_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(tmp.path(), Arc::new(MockProvider::new())).await;
        let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("reply")];
        let snapshot = history.clone();

        let state = pipeline
            .invoke(PipelineInput::new("noise", "Rowing Machine R5", history.clone()))
            .await
            .unwrap();

        assert_eq!(history, snapshot);
        assert_eq!(state.chat_history, snapshot);
    }

    #[tokio::test]
    async fn generation_failure_surfaces_as_generation_error() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::with_script(ChatScript::Fail("down".into())));
        let pipeline = pipeline_with(tmp.path(), provider).await;

        let err = pipeline.answer("noise", "Bike", &[]).await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }

    #[tokio::test]
    async fn retrieval_failure_skips_generation() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::failing_embeddings());
        let pipeline = pipeline_with(tmp.path(), provider.clone()).await;

        let err = pipeline.answer("noise", "Bike", &[]).await.unwrap_err();
        assert!(matches!(err, RagError::Retrieval(_)));
        assert_eq!(provider.chat_calls(), 0);
    }
}
