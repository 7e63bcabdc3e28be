// Node trait and types
// Base abstraction for pipeline stages

use async_trait::async_trait;
use thiserror::Error;

use crate::context::Generator;
use crate::core::errors::RagError;
use crate::rag::Retriever;

use super::state::PipelineState;

/// Collaborators available to every node
pub struct NodeContext<'a> {
    pub retriever: &'a Retriever,
    pub generator: &'a Generator,
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Continue to the given node, or follow the default edge when `None`
    Continue(Option<String>),
    /// Graph execution complete
    Final,
}

/// Graph execution error
///
/// `execution_trace` lists the node IDs executed before the failure,
/// most recent last.
#[derive(Debug, Error)]
#[error("graph error in {node_id}: {error}")]
pub struct GraphError {
    pub node_id: String,
    #[source]
    pub error: RagError,
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, error: RagError) -> Self {
        Self {
            node_id: node_id.into(),
            error,
            execution_trace: Vec::new(),
        }
    }

    /// Wiring fault in the graph itself rather than in a stage.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("runtime", RagError::Configuration(message.into()))
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl From<GraphError> for RagError {
    fn from(err: GraphError) -> Self {
        if err.execution_trace.is_empty() {
            tracing::error!("Pipeline failed in {}: {}", err.node_id, err.error);
        } else {
            tracing::error!(
                "Pipeline failed in {} (trace: {}): {}",
                err.node_id,
                err.execution_trace.join(" -> "),
                err.error
            );
        }
        err.error
    }
}

/// Node trait - every pipeline stage implements this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Consume the state and return it with this stage's outputs filled in.
    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<(PipelineState, NodeOutput), GraphError>;
}
