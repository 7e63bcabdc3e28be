// Pipeline Graph Module
// Two-stage StateGraph: retrieve -> generate

pub mod builder;
pub mod node;
pub mod runtime;
pub mod state;

pub mod nodes;
mod pipeline;

pub use builder::build_pipeline_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use pipeline::RagPipeline;
pub use runtime::{GraphBuilder, GraphRuntime};
pub use state::{PipelineInput, PipelineState};
