//! Ask command

use super::{llm_clients, read_text};
use crate::app::{AskArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use edutopia_core::{Agent, Config, SessionContext};
use std::sync::Arc;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let context = read_text(&args.context)?;
    let (client, embedder) = llm_clients(config, None)?;

    let session = Arc::new(SessionContext::new(
        embedder,
        config.rag.clone(),
        config.memory.clone(),
    ));
    let chunks = session.load(&context, "", "").await?;
    tracing::info!("Indexed {} chunks from {}", chunks, args.context.display());

    let agent = Agent::new(client, session);
    let reply = agent.respond(&args.query.join(" ")).await;
    output::emit(format, &reply, || reply.answer.clone())
}
