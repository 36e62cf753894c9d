//! Indexing pipeline
//!
//! Text chunking and the ephemeral vector store built from it.

mod chunker;
mod vector_store;

pub use chunker::*;
pub use vector_store::*;
