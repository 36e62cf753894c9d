//! Diagrams command

use crate::app::{DiagramsArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use edutopia_core::{Config, DiagramExtractor, EdutopiaError};
use std::fmt::Write;
use tokio_util::sync::CancellationToken;

pub async fn run(args: DiagramsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    if !args.video.exists() {
        return Err(EdutopiaError::NotFound(format!(
            "Video '{}' does not exist",
            args.video.display()
        ))
        .into());
    }
    let output_dir = args
        .output
        .unwrap_or_else(|| config.video.output_dir.clone());
    let extractor = DiagramExtractor::from_config(&config.video)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let extraction = extractor.extract(&args.video, &output_dir, &cancel).await?;
    output::emit(format, &extraction, || {
        let mut out = extraction.message();
        let _ = write!(out, " from {} frames", extraction.frames_processed);
        for object in &extraction.objects {
            let _ = write!(
                out,
                "\n  {} ({:.2}, {}) -> {}",
                object.class_name,
                object.confidence,
                object.resolution,
                output_dir.join(&object.file_path).display()
            );
        }
        out
    })
}
