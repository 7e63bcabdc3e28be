//! Deterministic provider for unit and integration tests: hashed
//! bag-of-words embeddings and a scripted chat model that answers only from
//! supplied context. Integration tests reach it via the `test-support` feature.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::context::prompt::{CONTEXT_HEADING, CONTEXT_SEPARATOR, NO_SOLUTION_PHRASE};
use crate::llm::{ChatRequest, LlmProvider, ProviderError, Role};
use crate::records::{normalize, Document, RepairRecord};

const DIM: usize = 64;

pub enum ChatScript {
    /// Answer from the context block when it mentions the asked equipment.
    Grounded,
    Fixed(String),
    Fail(String),
}

pub struct MockProvider {
    pub embed_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub last_request: Mutex<Option<ChatRequest>>,
    script: ChatScript,
    fail_embeddings: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_script(ChatScript::Grounded)
    }

    pub fn with_script(script: ChatScript) -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            script,
            fail_embeddings: false,
        }
    }

    pub fn failing_embeddings() -> Self {
        Self {
            fail_embeddings: true,
            ..Self::new()
        }
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() as usize) % DIM] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}

fn grounded_answer(request: &ChatRequest) -> String {
    let prompt = request
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .last()
        .unwrap_or_default();

    let equipment = prompt
        .lines()
        .find_map(|line| line.strip_prefix("Equipment: "))
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let context = prompt
        .split_once(CONTEXT_HEADING)
        .map(|(_, rest)| rest)
        .unwrap_or_default();

    let solution = context.split(CONTEXT_SEPARATOR).find_map(|block| {
        let mentions = block.lines().any(|line| {
            line.strip_prefix("- Equipment: ")
                .map(|value| value.trim().to_lowercase() == equipment)
                .unwrap_or(false)
        });
        if !mentions {
            return None;
        }
        block
            .lines()
            .find_map(|line| line.strip_prefix("- Applied solution: "))
            .map(str::to_string)
    });

    match solution {
        Some(solution) => format!(
            "Similar past orders were solved as follows: {}. These suggestions are based on maintenance history and do not replace an on-site diagnosis.",
            solution.trim()
        ),
        None => NO_SOLUTION_PHRASE.to_string(),
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ProviderError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let answer = match &self.script {
            ChatScript::Grounded => Ok(grounded_answer(&request)),
            ChatScript::Fixed(text) => Ok(text.clone()),
            ChatScript::Fail(msg) => Err(ProviderError::Unavailable(msg.clone())),
        };
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request);
        answer
    }

    async fn embed(
        &self,
        inputs: &[String],
        _model_id: &str,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embeddings {
            return Err(ProviderError::Unavailable(
                "embedding service unreachable".to_string(),
            ));
        }
        Ok(inputs.iter().map(|text| embed_text(text)).collect())
    }
}

pub fn repair_doc(id: &str, equipment: &str, complement: &str, resolution: &str) -> Document {
    normalize(
        id,
        &RepairRecord {
            order_id: Some(id.trim_start_matches("record-").to_string()),
            equipment: Some(equipment.to_string()),
            maintenance_type: Some("Corrective".to_string()),
            complement: Some(complement.to_string()),
            resolution: Some(resolution.to_string()),
            ..RepairRecord::default()
        },
    )
}

pub fn sample_corpus() -> Vec<Document> {
    vec![
        repair_doc(
            "record-0",
            "Treadmill X9000",
            "Belt slipping under load",
            "Replaced drive belt",
        ),
        repair_doc(
            "record-1",
            "Leg Press LP200",
            "Seat does not lock",
            "Replaced locking pin",
        ),
        repair_doc(
            "record-2",
            "Exercise Bike B2",
            "Display flickers",
            "Reseated display connector",
        ),
        repair_doc(
            "record-3",
            "Rowing Machine R5",
            "Chain noise",
            "Lubricated chain",
        ),
        repair_doc(
            "record-4",
            "Elliptical E7",
            "Pedal wobble",
            "Tightened pedal arm bolts",
        ),
    ]
}
