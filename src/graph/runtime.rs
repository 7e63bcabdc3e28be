// Graph Runtime - petgraph based
// Sequential StateGraph execution engine

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::PipelineState;

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, ()>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Maximum execution steps
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 10,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::runtime(format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::runtime(format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, ());
        Ok(())
    }

    /// Node IDs in insertion order
    pub fn node_ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .map(|node| node.id())
            .collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph from the entry node until a node returns `Final`.
    pub async fn run(
        &self,
        mut state: PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<PipelineState, GraphError> {
        if self.entry_node_id.is_empty() {
            return Err(GraphError::runtime("No entry node set"));
        }

        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::runtime(format!("Entry node not found: {}", self.entry_node_id))
        })?;

        let mut trace: Vec<String> = Vec::new();

        for step in 0..self.max_steps {
            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::runtime("Node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!("Executing node: {} (step {})", node_id, step);

            let (next_state, output) = node
                .execute(state, ctx)
                .await
                .map_err(|err| err.with_trace(trace.clone()))?;
            state = next_state;
            trace.push(node_id.to_string());

            match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(state);
                }
                NodeOutput::Continue(explicit_next) => {
                    current_idx = self
                        .resolve_next_node(current_idx, explicit_next.as_deref())
                        .map_err(|err| err.with_trace(trace.clone()))?;
                }
            }
        }

        Err(GraphError::runtime(format!("Maximum steps ({}) exceeded", self.max_steps))
            .with_trace(trace))
    }

    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        explicit: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        if let Some(next_id) = explicit {
            return self.node_indices.get(next_id).copied().ok_or_else(|| {
                GraphError::runtime(format!(
                    "Explicit target node not found from {}: {}",
                    current_id, next_id
                ))
            });
        }

        self.graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge| edge.target())
            .next()
            .ok_or_else(|| {
                GraphError::runtime(format!("No outgoing edges from node: {}", current_id))
            })
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges.push((from.into(), to.into()));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to) in self.pending_edges {
            self.runtime.add_edge(&from, &to)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
