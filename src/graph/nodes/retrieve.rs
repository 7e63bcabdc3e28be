// Retrieve Node
// Fills the context with the closest past work orders

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::PipelineState;

pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Retrieve Node"
    }

    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<(PipelineState, NodeOutput), GraphError> {
        let documents = ctx
            .retriever
            .retrieve(&state.equipment, &state.question)
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        Ok((state.with_context(documents), NodeOutput::Continue(None)))
    }
}
