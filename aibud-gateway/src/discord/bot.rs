use std::sync::{Arc, OnceLock};

use aibud_core::Reply;
use serenity::async_trait;
use serenity::builder::{
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
    EditInteractionResponse,
};
use serenity::model::application::{Command, CommandInteraction, Interaction};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::state::AppState;

use super::commands::{
    AI_COMMAND, AiCommand, CommandResponder, CommandResponse, build_ai_command, run_command,
};
use super::embeds::{help_embed, notice_embed, split_discord_message};

/// Discord bot handler
///
/// Conversation logic lives in [`crate::chat::ChatService`]; this type only
/// translates Discord events into calls on it.
pub struct Bot {
    state: Arc<AppState>,
    /// Set once the gateway reports `ready`
    bot_user_id: OnceLock<UserId>,
}

impl Bot {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            bot_user_id: OnceLock::new(),
        }
    }
}

/// Rewrite user mention markup for the prompt.
///
/// The bot's own mention is removed. Other known users become `@name`;
/// mentions of users not in `mentioned` are left as they are.
pub(super) fn clean_content(content: &str, bot_id: u64, mentioned: &[(u64, String)]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("<@") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let id_part = after.strip_prefix('!').unwrap_or(after);
        let digits = id_part.bytes().take_while(u8::is_ascii_digit).count();

        let id = id_part[..digits].parse::<u64>().ok();
        if let Some(id) = id.filter(|_| id_part[digits..].starts_with('>')) {
            let markup_end = &id_part[digits + 1..];
            if id == bot_id {
                rest = markup_end;
                continue;
            }
            if let Some((_, name)) = mentioned.iter().find(|(user_id, _)| *user_id == id) {
                out.push('@');
                out.push_str(name);
                rest = markup_end;
                continue;
            }
        }
        out.push_str("<@");
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Server nickname, else global display name, else username.
fn display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone())
}

#[async_trait]
impl EventHandler for Bot {
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore messages from bots (including ourselves)
        if msg.author.bot {
            return;
        }

        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let Some(bot_id) = self.bot_user_id.get().copied() else {
            return;
        };
        if !msg.mentions_user_id(bot_id) {
            return;
        }

        let name = display_name(&msg);
        let mentioned: Vec<(u64, String)> = msg
            .mentions
            .iter()
            .map(|user| {
                let name = user.global_name.clone().unwrap_or_else(|| user.name.clone());
                (user.id.get(), name)
            })
            .collect();
        let content = clean_content(&msg.content, bot_id.get(), &mentioned);
        debug!(guild_id = guild_id.get(), author = %name, "Discord message: {}", content);

        let typing = msg.channel_id.start_typing(&ctx.http);
        let reply = self.state.chat.respond(&content, guild_id.get(), &name).await;
        typing.stop();

        match reply {
            Reply::Text(text) => {
                for (i, chunk) in split_discord_message(&text).iter().enumerate() {
                    let sent = if i == 0 {
                        msg.reply(&ctx, chunk).await
                    } else {
                        msg.channel_id.say(&ctx.http, chunk).await
                    };
                    if let Err(e) = sent {
                        error!("Failed to send Discord reply: {}", e);
                        return;
                    }
                }
            }
            Reply::Notice(notice) => {
                let message = CreateMessage::new()
                    .embed(notice_embed(&notice))
                    .reference_message(&msg);
                if let Err(e) = msg.channel_id.send_message(&ctx.http, message).await {
                    error!("Failed to send Discord notice: {}", e);
                }
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Some(command) = interaction.as_command() {
            if command.data.name == AI_COMMAND {
                self.handle_ai_command(&ctx, command).await;
            }
        }
    }

    /// Bot is ready: remember our id and register the `/ai` command
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        // Reconnects fire `ready` again with the same id
        let _ = self.bot_user_id.set(ready.user.id);

        let command = build_ai_command(self.state.templates(), &self.state.settings.models);
        let registered = match self.state.settings.discord.guild_id {
            Some(id) => GuildId::new(id)
                .set_commands(&ctx.http, vec![command])
                .await
                .map(|_| info!(guild_id = id, "Registered /{} for guild", AI_COMMAND)),
            None => Command::set_global_commands(&ctx.http, vec![command])
                .await
                .map(|_| info!("Registered /{} globally", AI_COMMAND)),
        };

        if let Err(e) = registered {
            error!("Failed to register slash commands: {}", e);
        }
    }
}

impl Bot {
    async fn handle_ai_command(&self, ctx: &Context, command: &CommandInteraction) {
        let Some(guild_id) = command.guild_id else {
            debug!("Ignoring /{} outside a server", AI_COMMAND);
            return;
        };

        let parsed = AiCommand::from_data(&command.data);
        info!(guild_id = guild_id.get(), command = ?parsed, "Handling /{}", AI_COMMAND);

        let responder = InteractionResponder {
            ctx,
            command,
            state: &self.state,
        };
        run_command(&self.state, guild_id.get(), parsed, &responder).await;
    }
}

/// Answers a slash command through Discord's deferred response flow.
struct InteractionResponder<'a> {
    ctx: &'a Context,
    command: &'a CommandInteraction,
    state: &'a AppState,
}

#[async_trait]
impl<'a> CommandResponder for InteractionResponder<'a> {
    async fn acknowledge(&self) {
        // Acknowledge immediately; the record may be busy with a chat turn
        if let Err(e) = self
            .command
            .create_response(
                &self.ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await
        {
            error!("Failed to defer /{}: {}", AI_COMMAND, e);
        }
    }

    async fn deliver(&self, response: CommandResponse) {
        let embed = match response {
            CommandResponse::Help => help_embed(
                self.state.templates(),
                &self.state.settings.models,
                &self.state.chat.options().bot_label,
            ),
            CommandResponse::Notice(notice) => notice_embed(&notice),
        };

        if let Err(e) = self
            .command
            .edit_response(&self.ctx.http, EditInteractionResponse::new().embed(embed))
            .await
        {
            error!("Failed to respond to /{}: {}", AI_COMMAND, e);
        }
    }
}
