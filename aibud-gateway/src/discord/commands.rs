//! The `/ai` slash command: declaration, parsing and execution.

use aibud_core::{ModelChoice, Notice, ServerId, SetOutcome, StateError, TemplateSet};
use serenity::async_trait;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::{CommandData, CommandDataOptionValue, CommandOptionType};
use tracing::{info, warn};

use crate::state::AppState;

use super::embeds::personality_label;

pub const AI_COMMAND: &str = "ai";

/// Discord rejects commands with more choices than this
const MAX_CHOICES: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiCommand {
    Help,
    Reset,
    SetPersonality(String),
    SetModel(String),
    Unknown(String),
}

impl AiCommand {
    pub fn parse(subcommand: &str, value: Option<&str>) -> Self {
        let value = || value.unwrap_or_default().to_string();
        match subcommand {
            "help" => AiCommand::Help,
            "reset" => AiCommand::Reset,
            "set-personality" => AiCommand::SetPersonality(value()),
            "set-model" => AiCommand::SetModel(value()),
            other => AiCommand::Unknown(other.to_string()),
        }
    }

    /// Read the subcommand and its first string argument from interaction data.
    pub fn from_data(data: &CommandData) -> Self {
        let Some(subcommand) = data.options.first() else {
            return AiCommand::Unknown(String::new());
        };

        let value = match &subcommand.value {
            CommandDataOptionValue::SubCommand(options) => {
                options.first().and_then(|o| o.value.as_str())
            }
            _ => None,
        };

        Self::parse(&subcommand.name, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    Help,
    Notice(Notice),
}

pub fn build_ai_command(templates: &TemplateSet, models: &[ModelChoice]) -> CreateCommand {
    let personality = templates.names().take(MAX_CHOICES).fold(
        CreateCommandOption::new(CommandOptionType::String, "personality", "Personality to use")
            .required(true),
        |option, name| option.add_string_choice(personality_label(name), name),
    );
    let model = models.iter().take(MAX_CHOICES).fold(
        CreateCommandOption::new(CommandOptionType::String, "model", "Completion model to use")
            .required(true),
        |option, choice| option.add_string_choice(&choice.label, &choice.id),
    );

    CreateCommand::new(AI_COMMAND)
        .description("Chat bot settings")
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "help",
            "Show usage and available options",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "reset",
            "Erase the conversation memory",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "set-personality",
                "Change the personality",
            )
            .add_sub_option(personality),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "set-model",
                "Change the completion model (resets the conversation)",
            )
            .add_sub_option(model),
        )
}

/// Where a command's answer goes.
///
/// Commands may wait on a server record that a chat turn is holding, so the
/// interaction is acknowledged before any state is touched and the answer
/// is delivered afterwards.
#[async_trait]
pub trait CommandResponder: Send + Sync {
    async fn acknowledge(&self);
    async fn deliver(&self, response: CommandResponse);
}

/// Acknowledge, execute, then deliver the outcome.
pub async fn run_command(
    state: &AppState,
    server_id: ServerId,
    command: AiCommand,
    responder: &dyn CommandResponder,
) {
    responder.acknowledge().await;
    let response = execute(state, server_id, command).await;
    responder.deliver(response).await;
}

fn state_error_notice(error: &StateError) -> Notice {
    Notice::warning(error.to_string())
}

pub async fn execute(state: &AppState, server_id: ServerId, command: AiCommand) -> CommandResponse {
    let registry = state.registry();

    let notice = match command {
        AiCommand::Help => return CommandResponse::Help,
        AiCommand::Reset => {
            registry.reset(server_id).await;
            Notice::success("Conversation reset")
        }
        AiCommand::SetPersonality(name) => match registry.set_template(server_id, &name).await {
            Ok(SetOutcome::Changed) => {
                Notice::success(format!("Personality set to {}", personality_label(&name)))
            }
            Ok(SetOutcome::AlreadySet) => {
                Notice::info(format!("Personality already set to {}", personality_label(&name)))
            }
            Err(e) => {
                warn!(server_id, "set-personality rejected: {}", e);
                state_error_notice(&e)
            }
        },
        AiCommand::SetModel(id) => {
            let label = state
                .settings
                .model_choice(&id)
                .map_or(id.as_str(), |choice| choice.label.as_str());
            match registry.set_model(server_id, &id).await {
                Ok(SetOutcome::Changed) => Notice::success(format!(
                    "Model set to {}\nThe conversation has been reset",
                    label
                )),
                Ok(SetOutcome::AlreadySet) => {
                    Notice::info(format!("Model already set to {}", label))
                }
                Err(e) => {
                    warn!(server_id, "set-model rejected: {}", e);
                    state_error_notice(&e)
                }
            }
        }
        AiCommand::Unknown(name) => {
            info!(server_id, subcommand = %name, "Unknown /ai subcommand");
            Notice::info("Unknown command\nUse `/ai help` to see the available commands")
        }
    };

    CommandResponse::Notice(notice)
}
