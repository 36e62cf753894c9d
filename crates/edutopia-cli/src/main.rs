//! Edutopia CLI
//!
//! Runs the learning assistant services, or any single pipeline from the shell.

use anyhow::Result;
use clap::Parser;
use edutopia_core::error::exit_codes;
use edutopia_core::{Config, EdutopiaError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if matches!(cli.command, Commands::Serve(_)) {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<EdutopiaError>()
            .map(EdutopiaError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, config).await,
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format).await,
        Commands::Questions(args) => commands::questions::run(args, &config, cli.format).await,
        Commands::Summarize(args) => commands::summarize::run(args, &config, cli.format).await,
        Commands::Analyze(args) => commands::analyze::run(args, &config, cli.format).await,
        Commands::Ocr(args) => commands::ocr::run(args, &config, cli.format).await,
        Commands::Diagrams(args) => commands::diagrams::run(args, &config, cli.format).await,
    }
}
