//! OCR command

use crate::app::{OcrArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use edutopia_core::{Config, OcrPipeline};

pub async fn run(args: OcrArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let output_dir = args.output.unwrap_or_else(|| config.ocr.output_dir.clone());
    let pipeline = OcrPipeline::from_config(&config.ocr);
    let result = pipeline.process_file(&args.file, &output_dir).await?;

    output::emit(format, &result, || {
        format!(
            "{}\n\nText files saved in: {}",
            result.combined_text.trim(),
            result.text_dir.display()
        )
    })
}
