mod bot;
pub mod commands;
pub mod embeds;

use std::sync::Arc;

use serenity::prelude::*;
use tracing::info;

pub use bot::Bot;

/// Build the Discord client; the caller drives it with `start()`.
pub async fn start_discord_bot(
    token: &str,
    state: Arc<crate::state::AppState>,
) -> Result<Client, DiscordError> {
    if token.trim().is_empty() {
        return Err(DiscordError::MissingToken);
    }

    info!("Starting Discord bot...");

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let client = Client::builder(token, intents)
        .event_handler(Bot::new(state))
        .await
        .map_err(|e| DiscordError::ClientError(e.to_string()))?;

    Ok(client)
}

/// Discord-related errors
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("DISCORD_BOT_TOKEN is not set")]
    MissingToken,

    #[error("Failed to create Discord client: {0}")]
    ClientError(String),

    #[error("Discord client stopped: {0}")]
    Runtime(String),
}
