//! Summarize command

use super::{llm_clients, read_text};
use crate::app::{OutputFormat, SummarizeArgs};
use crate::output;
use anyhow::Result;
use edutopia_core::transcript::{Summarizer, TranscriptSource, YouTubeTranscriptFetcher};
use edutopia_core::{youtube_video_id, Config, EdutopiaError};
use std::time::Duration;

pub async fn run(args: SummarizeArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let text = match (args.text, args.video) {
        (Some(path), _) => read_text(&path)?,
        (None, Some(url)) => fetch_transcript(&url, config).await?,
        (None, None) => {
            return Err(EdutopiaError::InvalidInput("Provide --text or --video".into()).into())
        }
    };

    let (client, embedder) = llm_clients(config, Some(0.0))?;
    let summary = Summarizer::new(client, embedder, config.rag.clone())
        .summarize(&text)
        .await?;
    output::emit(format, &summary, || {
        format!("{}\n\n({:.2}s)", summary.summary, summary.response_time)
    })
}

/// Transcript text for a YouTube URL
pub async fn fetch_transcript(url: &str, config: &Config) -> Result<String> {
    let video_id = youtube_video_id(url)
        .ok_or_else(|| EdutopiaError::InvalidInput(format!("Invalid YouTube URL: {}", url)))?;
    let fetcher =
        YouTubeTranscriptFetcher::new(Duration::from_secs(config.llm_service.timeout_secs))?;
    Ok(fetcher.fetch(&video_id).await?)
}
