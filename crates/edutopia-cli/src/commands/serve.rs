//! Serve command

use crate::app::ServeArgs;
use anyhow::Result;
use edutopia_core::Config;

pub async fn run(args: ServeArgs, config: Config) -> Result<()> {
    let services = args.service.services();
    edutopia_server::start_server(config, &services).await
}
