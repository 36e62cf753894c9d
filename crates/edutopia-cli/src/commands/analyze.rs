//! Analyze command

use super::llm_clients;
use super::summarize::fetch_transcript;
use crate::app::{AnalyzeArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use edutopia_core::{Config, TranscriptAnalyzer};
use std::fmt::Write;

pub async fn run(args: AnalyzeArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let transcript = fetch_transcript(&args.url, config).await?;
    let (client, embedder) = llm_clients(config, Some(0.0))?;

    let analysis = TranscriptAnalyzer::new(client, embedder, config.rag.clone())
        .analyze(&transcript)
        .await?;

    output::emit(format, &analysis, || {
        let mut out = analysis.analysis.clone();
        out.push_str("\n\nRelevant sections:\n");
        for section in &analysis.relevant_sections {
            let _ = writeln!(out, "[{:.3}] {}", section.relevance_score, section.content);
        }
        out
    })
}
