//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat completions via OpenAI-compatible services (Groq, vLLM, OpenAI)
//! - Embedding generation via external services
//! - Response caching and request metrics

mod cache;
mod client;
mod http_embedder;
mod traits;

pub use cache::{CacheStats, LLMCache};
pub use client::{ChatMessage, LLMClient, MetricsSnapshot, OpenAiCompatClient};
pub use http_embedder::HttpEmbedder;
pub use traits::*;

/// Run a single-turn prompt as one user message
pub async fn complete(client: &dyn LLMClient, prompt: impl Into<String>) -> crate::Result<String> {
    client
        .chat_completion(vec![ChatMessage::user(prompt)])
        .await
}
