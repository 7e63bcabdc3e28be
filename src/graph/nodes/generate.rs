// Generate Node
// Produces the grounded answer; terminal stage

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::PipelineState;

pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    fn name(&self) -> &'static str {
        "Generate Node"
    }

    async fn execute(
        &self,
        state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<(PipelineState, NodeOutput), GraphError> {
        let answer = ctx
            .generator
            .generate(
                &state.question,
                &state.equipment,
                state.context_docs(),
                &state.chat_history,
            )
            .await
            .map_err(|e| GraphError::new(self.id(), e))?;

        Ok((state.with_answer(answer), NodeOutput::Final))
    }
}
