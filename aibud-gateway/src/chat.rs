//! Prompt generation flow.
//!
//! One call to [`ChatService::respond`] handles one inbound message: it
//! resolves the server record, edits the active transcript, asks the
//! completion backend for the bot's turn and records the answer. The record's
//! lock is held for the whole turn, so turns for one server never interleave.

use std::sync::Arc;

use aibud_core::transcript::{normalize_input, user_turn};
use aibud_core::{GenerationSettings, Notice, Reply, ServerId, ServerRegistry, Settings};
use tracing::{debug, error, info, warn};

use crate::providers::{CompletionProvider, CompletionRequest, ProviderError};

/// Errors that end a chat turn without a generated reply
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is empty after normalization")]
    EmptyInput,

    #[error("Completion backend returned empty text")]
    EmptyResponse,

    #[error("Completion backend failed: {0}")]
    Gateway(#[from] ProviderError),
}

impl ChatError {
    /// User-visible notice for this error.
    pub fn notice(&self) -> Notice {
        match self {
            ChatError::EmptyInput => Notice::warning(
                "You sent an empty message\nMake sure your message does not only contain whitespace",
            ),
            ChatError::EmptyResponse => {
                Notice::warning("Empty response received from the completion engine")
            }
            ChatError::Gateway(_) => Notice::error("Error occurred while generating the reply"),
        }
    }
}

/// Conversation knobs taken from settings.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub char_limit: usize,
    pub placeholder: String,
    pub bot_label: String,
    pub trigger_prefix: String,
    pub generation: GenerationSettings,
}

impl ChatOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            char_limit: settings.conversation.char_limit,
            placeholder: settings.conversation.placeholder.clone(),
            bot_label: settings.conversation.bot_label.clone(),
            trigger_prefix: settings.discord.trigger_prefix.clone(),
            generation: settings.generation.clone(),
        }
    }
}

/// Orchestrates chat turns over the server registry and a completion backend.
pub struct ChatService {
    registry: ServerRegistry,
    provider: Arc<dyn CompletionProvider>,
    options: ChatOptions,
}

impl ChatService {
    pub fn new(
        registry: ServerRegistry,
        provider: Arc<dyn CompletionProvider>,
        options: ChatOptions,
    ) -> Self {
        Self {
            registry,
            provider,
            options,
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Handle a message and turn every outcome into a [`Reply`].
    pub async fn respond(&self, raw_text: &str, server_id: ServerId, display_name: &str) -> Reply {
        match self.generate(raw_text, server_id, display_name).await {
            Ok(text) => Reply::Text(text),
            Err(e) => e.notice().into(),
        }
    }

    /// Run one chat turn and return the trimmed generated text.
    ///
    /// On a backend failure the user's turn stays in the transcript; it is
    /// not rolled back.
    pub async fn generate(
        &self,
        raw_text: &str,
        server_id: ServerId,
        display_name: &str,
    ) -> Result<String, ChatError> {
        let handle = self.registry.get_or_create(server_id).await;
        let mut record = handle.lock().await;

        if record.substitute_name_once(&self.options.placeholder, display_name) {
            info!(server_id, name = display_name, "Replaced placeholder speaker name");
        }

        let text = normalize_input(raw_text, &self.options.trigger_prefix);
        if text.is_empty() {
            warn!(server_id, "Ignoring empty message");
            return Err(ChatError::EmptyInput);
        }

        record.truncate_active(self.options.char_limit);
        record.append_to_active(&user_turn(display_name, &text, &self.options.bot_label));

        let request = CompletionRequest::new(
            record.selected_model(),
            record.active_transcript(),
            &self.options.generation,
        );

        info!(
            server_id,
            provider = self.provider.name(),
            model = %request.model,
            template = %record.selected_template(),
            "Generating reply"
        );

        let generated = match self.provider.complete(&request).await {
            Ok(generated) => generated,
            Err(e) => {
                error!(server_id, model = %request.model, "Completion failed: {}", e);
                return Err(ChatError::Gateway(e));
            }
        };

        let reply = generated.trim();
        if reply.is_empty() {
            warn!(server_id, model = %request.model, "Empty response from completion backend");
            return Err(ChatError::EmptyResponse);
        }

        record.append_to_active(&format!("{}\n", reply));
        debug!(server_id, "{}: {} / {}: {}", display_name, text, self.options.bot_label, reply);

        Ok(reply.to_string())
    }
}
