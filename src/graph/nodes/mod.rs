// Graph Nodes

mod generate;
mod retrieve;

pub use generate::GenerateNode;
pub use retrieve::RetrieveNode;
