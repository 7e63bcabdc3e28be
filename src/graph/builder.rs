// Graph Builder
// Constructs the retrieve -> generate pipeline graph

use super::node::GraphError;
use super::nodes::{GenerateNode, RetrieveNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// Build the two-stage pipeline graph
pub fn build_pipeline_graph() -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("retrieve")
        .max_steps(4)
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(GenerateNode::new()))
        .edge("retrieve", "generate")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_graph_is_acyclic_and_ordered() {
        let graph = build_pipeline_graph().unwrap();
        assert!(!graph.has_cycle());
        assert_eq!(graph.node_ids(), vec!["retrieve", "generate"]);
    }
}
