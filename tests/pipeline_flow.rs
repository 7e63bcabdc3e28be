use std::path::Path;
use std::sync::Arc;

use repair_assistant::context::NO_SOLUTION_PHRASE;
use repair_assistant::core::config::{CorpusSettings, HistorySettings, Settings};
use repair_assistant::rag::IndexOutcome;
use repair_assistant::test_support::MockProvider;
use repair_assistant::{AppState, PipelineInput, RagError};

const HISTORY_CSV: &str = "OS,TIPO EQUIPAMENTO,EQUIPAMENTO,TIPO,MARCA,TEMPO,HORARIO INICIO,HORARIO FIM,TIPO DE SERVIÇO,COMPLEMENTO,RESOLUÇÃO\n\
5001,Cardio,Treadmill X9000,Corrective,Movement,,2024-03-01 08:00:00,2024-03-01 09:30:00,Mechanical,Belt slipping under load,Replaced drive belt\n\
5002,Strength,Leg Press LP200,Corrective,Forge,0.75,,,Mechanical,Seat does not lock,Replaced locking pin\n\
5003,Cardio,Exercise Bike B2,Preventive,Movement,0.5,,,Electrical,Display flickers,Reseated display connector\n\
5004,Cardio,Rowing Machine R5,Corrective,Aqua,1,,,Mechanical,Chain noise,Lubricated chain\n";

fn settings_in(dir: &Path) -> Settings {
    let data = dir.join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("history.csv"), HISTORY_CSV).unwrap();

    Settings {
        corpus: CorpusSettings {
            source_path: data.join("history.csv"),
            index_dir: dir.join("index"),
            embed_batch_size: 3,
            ..CorpusSettings::default()
        },
        history: HistorySettings {
            db_path: data.join("conversations.db"),
        },
        ..Settings::default()
    }
}

#[tokio::test]
async fn treadmill_belt_question_is_answered_from_history() {
    let tmp = tempfile::tempdir().unwrap();
    let model = Arc::new(MockProvider::new());
    let state = AppState::with_provider(settings_in(tmp.path()), model.clone())
        .await
        .unwrap();

    assert!(matches!(
        state.index.outcome(),
        IndexOutcome::Built {
            documents: 4,
            embedding_calls: 2
        }
    ));

    let result = state
        .pipeline
        .invoke(PipelineInput::new(
            "belt slipping",
            "Treadmill X9000",
            Vec::new(),
        ))
        .await
        .unwrap();

    let context = result.context.unwrap();
    assert!(context.len() <= 4);
    let treadmill = context
        .iter()
        .find(|doc| doc.metadata.equipment == "Treadmill X9000")
        .expect("treadmill order retrieved");
    assert_eq!(treadmill.metadata.order_id, "5001");
    assert!(treadmill
        .content
        .contains("- Maintenance duration (hours): 1.50"));
    assert!(result.answer.unwrap().contains("Replaced drive belt"));

    state.close().await;
}

#[tokio::test]
async fn equipment_outside_the_history_gets_the_fixed_phrase() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::with_provider(settings_in(tmp.path()), Arc::new(MockProvider::new()))
        .await
        .unwrap();

    let answer = state
        .pipeline
        .answer("hydraulic leak", "Forklift F1", &[])
        .await
        .unwrap();
    assert_eq!(answer, NO_SOLUTION_PHRASE);

    state.close().await;
}

#[tokio::test]
async fn conversation_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let model = Arc::new(MockProvider::new());

    let first = AppState::with_provider(settings_in(tmp.path()), model.clone())
        .await
        .unwrap();
    let reply = first
        .assistant
        .ask(None, "Rowing Machine R5", "chain noise")
        .await
        .unwrap();
    assert!(reply.answer.contains("Lubricated chain"));
    first.close().await;
    let embeds_after_build = model.embed_calls();

    let second = AppState::with_provider(settings_in(tmp.path()), model.clone())
        .await
        .unwrap();
    assert!(matches!(
        second.index.outcome(),
        IndexOutcome::Loaded { documents: 4 }
    ));
    assert_eq!(model.embed_calls(), embeds_after_build);

    second
        .assistant
        .ask(Some(reply.conversation_id), "Rowing Machine R5", "still noisy")
        .await
        .unwrap();

    let listed = second.assistant.conversations().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Rowing Machine R5...");
    assert_eq!(listed[0].messages.len(), 4);
    assert_eq!(model.chat_calls(), 2);

    second.close().await;
}

#[tokio::test]
async fn blank_fault_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::with_provider(settings_in(tmp.path()), Arc::new(MockProvider::new()))
        .await
        .unwrap();

    let err = state
        .assistant
        .ask(None, "Treadmill X9000", "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    state.close().await;
}
