//! Questions command

use super::{llm_clients, read_text};
use crate::app::{OutputFormat, QuestionsArgs};
use crate::output;
use anyhow::Result;
use edutopia_core::questions::{format_questions, QuestionKind};
use edutopia_core::{Config, EdutopiaError, QuestionGenerator};

pub async fn run(args: QuestionsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let text = read_text(&args.file)?;
    if text.trim().is_empty() {
        return Err(EdutopiaError::InvalidInput(format!("{} is empty", args.file.display())).into());
    }
    let kind = QuestionKind::from(args.kind);
    let (client, _) = llm_clients(config, None)?;

    let generator = QuestionGenerator::new(client);
    let input = format!("{} ### {}", text.trim(), kind.request());
    let set = generator.generate_set(&input).await?;
    output::emit(format, &set, || format_questions(&set))
}
