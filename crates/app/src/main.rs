mod commands;
mod config;
mod error;
mod render;

use std::time::Duration;

use client::{Client, FileCredentialStore, ReqwestTransport};

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fintrack={level},client={level},dashboard={level}",
            level = config.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let transport =
        ReqwestTransport::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))?;
    let client = Client::new(transport, FileCredentialStore::new(&config.token_path));
    tracing::debug!("using {} with token file {}", config.base_url, config.token_path);

    commands::run(&client, command).await
}
