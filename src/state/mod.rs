use std::sync::Arc;
use std::time::Duration;

use crate::assistant::RepairAssistant;
use crate::context::Generator;
use crate::core::config::Settings;
use crate::graph::RagPipeline;
use crate::history::ConversationStore;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{CorpusIndex, Retriever};
use crate::records::CsvRecordSource;

pub mod error;
pub mod global;

use error::InitializationError;

/// Everything a request needs, wired once at startup.
///
/// The corpus index is read-only after construction and shared through `Arc`.
pub struct AppState {
    pub provider: Arc<dyn LlmProvider>,
    pub index: Arc<CorpusIndex>,
    pub pipeline: Arc<RagPipeline>,
    pub assistant: RepairAssistant,
}

impl AppState {
    /// Initializes the application state with the HTTP provider from settings.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        if settings.llm.api_key.is_none() {
            tracing::warn!(
                "No API key configured for {}; requests are sent unauthenticated",
                settings.llm.base_url
            );
        }

        let provider = OpenAiProvider::new(
            &settings.llm.base_url,
            settings.llm.api_key.as_deref(),
            Duration::from_secs(settings.llm.timeout_secs),
        )
        .map_err(InitializationError::Provider)?;

        Self::with_provider(settings, Arc::new(provider)).await
    }

    /// Initializes the application state around an existing provider.
    ///
    /// 1. Loads the corpus index, building it from the CSV source on first run
    /// 2. Wires retriever and generator into the pipeline graph
    /// 3. Opens the conversation store
    pub async fn with_provider(
        settings: Settings,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let source = CsvRecordSource::new(
            settings.corpus.source_path.clone(),
            settings.corpus.columns.clone(),
        );

        let index = Arc::new(
            CorpusIndex::load_or_build(
                &settings.corpus,
                &settings.llm.embedding_model,
                provider.clone(),
                &source,
            )
            .await
            .map_err(InitializationError::Corpus)?,
        );

        let retriever = Retriever::new(index.clone(), &settings.retrieval);
        let generator = Generator::new(
            provider.clone(),
            settings.llm.chat_model.clone(),
            settings.llm.max_tokens,
        );
        let pipeline = Arc::new(
            RagPipeline::new(retriever, generator).map_err(InitializationError::Pipeline)?,
        );

        let conversations = ConversationStore::open(&settings.history.db_path)
            .await
            .map_err(InitializationError::History)?;
        let assistant = RepairAssistant::new(pipeline.clone(), conversations);

        tracing::info!(
            "Assistant ready: {} ({} documents, chat model {})",
            provider.name(),
            index.outcome().documents(),
            settings.llm.chat_model
        );

        Ok(Arc::new(AppState {
            provider,
            index,
            pipeline,
            assistant,
        }))
    }

    /// Closes the database pools. The state must not be used afterwards.
    pub async fn close(&self) {
        self.assistant.close().await;
        self.index.close().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::config::{CorpusSettings, HistorySettings};
    use crate::rag::IndexOutcome;
    use crate::test_support::MockProvider;
    use std::path::Path;

    pub(crate) const CSV: &str = "OS,TIPO EQUIPAMENTO,EQUIPAMENTO,TIPO,MARCA,TEMPO,TIPO DE SERVIÇO,COMPLEMENTO,RESOLUÇÃO\n\
101,Cardio,Treadmill X9000,Corrective,Acme,1.5,Mechanical,Belt slipping under load,Replaced drive belt\n\
102,Strength,Leg Press LP200,Preventive,Forge,0.5,Mechanical,Seat does not lock,Replaced locking pin\n";

    pub(crate) fn settings_in(dir: &Path) -> Settings {
        let data = dir.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("history.csv"), CSV).unwrap();

        Settings {
            corpus: CorpusSettings {
                source_path: data.join("history.csv"),
                index_dir: dir.join("index"),
                ..CorpusSettings::default()
            },
            history: HistorySettings {
                db_path: data.join("conversations.db"),
            },
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn first_start_builds_and_second_start_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());

        let first = AppState::with_provider(settings_in(tmp.path()), provider.clone())
            .await
            .unwrap();
        assert!(matches!(
            first.index.outcome(),
            IndexOutcome::Built { documents: 2, .. }
        ));
        first.close().await;
        let calls = provider.embed_calls();

        let second = AppState::with_provider(settings_in(tmp.path()), provider.clone())
            .await
            .unwrap();
        assert!(matches!(
            second.index.outcome(),
            IndexOutcome::Loaded { documents: 2 }
        ));
        assert_eq!(provider.embed_calls(), calls);

        let reply = second
            .assistant
            .ask(None, "Treadmill X9000", "belt slipping")
            .await
            .unwrap();
        assert!(reply.answer.contains("Replaced drive belt"));
        second.close().await;
    }

    #[tokio::test]
    async fn missing_source_is_a_corpus_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = settings_in(tmp.path());
        settings.corpus.source_path = tmp.path().join("data/absent.csv");

        let err = AppState::with_provider(settings, Arc::new(MockProvider::new()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, InitializationError::Corpus(_)));
        assert!(err.user_message().contains("absent.csv"));
    }
}
