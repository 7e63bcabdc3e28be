//! One user turn: validate, thread the transcript through the pipeline,
//! persist the result.

use std::sync::Arc;

use crate::core::errors::RagError;
use crate::graph::RagPipeline;
use crate::history::{Conversation, ConversationStore};
use crate::llm::ChatMessage;

const NAME_CHARS: usize = 30;

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub conversation_id: i64,
    pub answer: String,
}

/// Display name for a conversation: the first 30 characters of the equipment.
pub fn display_name(equipment: &str) -> String {
    let prefix: String = equipment.chars().take(NAME_CHARS).collect();
    format!("{}...", prefix)
}

/// Text stored for the user's side of a turn.
pub fn user_turn(equipment: &str, fault: &str) -> String {
    format!("**Equipment:** {}\n\n**Reported fault:** {}", equipment, fault)
}

pub struct RepairAssistant {
    pipeline: Arc<RagPipeline>,
    conversations: ConversationStore,
}

impl RepairAssistant {
    pub fn new(pipeline: Arc<RagPipeline>, conversations: ConversationStore) -> Self {
        Self {
            pipeline,
            conversations,
        }
    }

    /// Answers one question and stores the extended transcript.
    ///
    /// Nothing is written when the pipeline fails.
    pub async fn ask(
        &self,
        conversation_id: Option<i64>,
        equipment: &str,
        fault: &str,
    ) -> Result<TurnReply, RagError> {
        let equipment = equipment.trim();
        let fault = fault.trim();
        if equipment.is_empty() {
            return Err(RagError::InvalidInput(
                "Please describe the equipment.".to_string(),
            ));
        }
        if fault.is_empty() {
            return Err(RagError::InvalidInput(
                "Please describe the reported fault.".to_string(),
            ));
        }

        let mut transcript = match conversation_id {
            Some(id) => self
                .conversations
                .get(id)
                .await?
                .ok_or_else(|| {
                    RagError::InvalidInput(format!("Conversation {} does not exist.", id))
                })?
                .messages,
            None => Vec::new(),
        };

        transcript.push(ChatMessage::user(user_turn(equipment, fault)));

        let answer = self.pipeline.answer(fault, equipment, &transcript).await?;
        transcript.push(ChatMessage::assistant(answer.clone()));

        let name = display_name(equipment);
        let conversation_id = match conversation_id {
            Some(id) => {
                self.conversations.update(id, &name, &transcript).await?;
                id
            }
            None => self.conversations.insert(&name, &transcript).await?,
        };

        tracing::info!(
            "Answered turn {} of conversation {}",
            transcript.len() / 2,
            conversation_id
        );

        Ok(TurnReply {
            conversation_id,
            answer,
        })
    }

    pub async fn conversation(&self, id: i64) -> Result<Option<Conversation>, RagError> {
        self.conversations.get(id).await
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, RagError> {
        self.conversations.list().await
    }

    pub async fn close(&self) {
        self.conversations.close().await;
    }
}
