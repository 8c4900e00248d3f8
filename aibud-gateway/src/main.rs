use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aibud_gateway::discord::{DiscordError, start_discord_bot};
use aibud_gateway::providers::build_provider;
use aibud_gateway::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = aibud_core::Config::load()?;

    // RUST_LOG wins over the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.settings.logging.level.as_str().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded (provider: {}, default personality: {}, default model: {})",
        config.settings.provider.kind,
        config.settings.conversation.default_template,
        config.settings.conversation.default_model
    );

    let provider = build_provider(&config)?;
    let state = Arc::new(AppState::new(&config, provider));

    if !config.settings.discord.enabled {
        info!("Discord bot disabled in config, nothing to run");
        return Ok(());
    }

    let token = config.secrets.require_discord_token()?;
    let mut client = start_discord_bot(token, Arc::clone(&state)).await?;
    let shard_manager = Arc::clone(&client.shard_manager);

    tokio::select! {
        result = client.start() => {
            result.map_err(|e| DiscordError::Runtime(e.to_string()))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down Discord bot");
            shard_manager.shutdown_all().await;
        }
    }

    Ok(())
}
