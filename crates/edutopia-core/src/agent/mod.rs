//! Chat agent: routes each query to retrieval answering or question generation

mod rag_tool;
mod state;
mod workflow;

pub use rag_tool::{extract_topic, RagAnswer, RagTool, UNKNOWN_SENTINEL};
pub use state::{AgentState, Node, Route, Step, ToolUsed};
pub use workflow::{Agent, Reply, NOT_INITIALIZED};
