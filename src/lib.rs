//! Retrieval-augmented repair assistant over an equipment maintenance history.

pub mod assistant;
pub mod context;
pub mod core;
pub mod graph;
pub mod history;
pub mod llm;
pub mod rag;
pub mod records;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use assistant::{RepairAssistant, TurnReply};
pub use crate::core::errors::RagError;
pub use graph::{PipelineInput, PipelineState, RagPipeline};
pub use state::AppState;
