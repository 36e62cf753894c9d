//! CLI command handlers

pub mod analyze;
pub mod ask;
pub mod diagrams;
pub mod ocr;
pub mod questions;
pub mod serve;
pub mod summarize;

use anyhow::{Context, Result};
use edutopia_core::llm::{Embedder, HttpEmbedder, LLMClient, OpenAiCompatClient};
use edutopia_core::Config;
use std::path::Path;
use std::sync::Arc;

/// Chat client and embedder built from the LLM service settings
pub fn llm_clients(config: &Config, temperature: Option<f32>) -> Result<(Arc<dyn LLMClient>, Arc<dyn Embedder>)> {
    let service = match temperature {
        Some(t) => config.llm_service.with_temperature(t),
        None => config.llm_service.clone(),
    };
    let client: Arc<dyn LLMClient> = Arc::new(OpenAiCompatClient::new(service)?);
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(client.clone()));
    Ok((client, embedder))
}

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
