//! Hansard RAG API server
//!
//! Usage:
//!   hansard-api [CONFIG_PATH]
//!
//! Configuration is read from the optional file argument (json/toml/yaml),
//! then overridden by HANSARD_* environment variables.

use hansard_rag::api::{start_server, AppState};
use hansard_rag::config::RagConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            RagConfig::from_file(&path)?
        }
        None => RagConfig::default(),
    };
    config.apply_env();
    config.validate()?;

    info!("Starting Hansard RAG API v{}", hansard_rag::VERSION);
    info!("Index engine: {}", config.index.url);
    info!(
        "Generator: {} ({})",
        config.generator.url, config.generator.model
    );

    let state = AppState::new(config.clone());

    // Log dependency health up front so a cold start is visible
    if !state.gateway.health().await {
        warn!("Index engine is not reachable yet");
    }
    if !state.generator.health().await {
        warn!("Generator is not reachable yet or the model is missing");
    }

    start_server(state, &config.server.host, config.server.port).await?;

    Ok(())
}
