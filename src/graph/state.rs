// Pipeline State
// Carrier threaded by value through retrieve -> generate

use crate::llm::ChatMessage;
use crate::records::Document;

/// Caller-supplied fields of one invocation.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub question: String,
    pub equipment: String,
    pub chat_history: Vec<ChatMessage>,
}

impl PipelineInput {
    pub fn new(
        question: impl Into<String>,
        equipment: impl Into<String>,
        chat_history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            question: question.into(),
            equipment: equipment.into(),
            chat_history,
        }
    }
}

/// Inputs plus the outputs accumulated by the stages.
///
/// `context` stays `None` until retrieval ran; `answer` until generation ran.
/// `chat_history` is a private copy, the caller's transcript is never touched.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub question: String,
    pub equipment: String,
    pub chat_history: Vec<ChatMessage>,
    pub context: Option<Vec<Document>>,
    pub answer: Option<String>,
}

impl From<PipelineInput> for PipelineState {
    fn from(input: PipelineInput) -> Self {
        Self {
            question: input.question,
            equipment: input.equipment,
            chat_history: input.chat_history,
            context: None,
            answer: None,
        }
    }
}

impl PipelineState {
    pub fn with_context(self, context: Vec<Document>) -> Self {
        Self {
            context: Some(context),
            ..self
        }
    }

    pub fn with_answer(self, answer: String) -> Self {
        Self {
            answer: Some(answer),
            ..self
        }
    }

    pub fn context_docs(&self) -> &[Document] {
        self.context.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_no_outputs() {
        let state = PipelineState::from(PipelineInput::new("q", "e", vec![ChatMessage::user("hi")]));
        assert!(state.context.is_none());
        assert!(state.answer.is_none());
        assert!(state.context_docs().is_empty());
        assert_eq!(state.chat_history.len(), 1);
    }

    #[test]
    fn outputs_fill_designated_fields() {
        let state = PipelineState::default()
            .with_context(Vec::new())
            .with_answer("done".to_string());
        assert_eq!(state.context.as_deref().map(|c| c.len()), Some(0));
        assert_eq!(state.answer.as_deref(), Some("done"));
    }
}
