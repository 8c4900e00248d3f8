use std::sync::Arc;

use aibud_core::{Config, ServerRegistry, Settings, TemplateSet};

use crate::chat::{ChatOptions, ChatService};
use crate::providers::CompletionProvider;

/// Shared application state
pub struct AppState {
    /// Chat orchestration, owns the server registry
    pub chat: ChatService,
    /// Loaded settings (models offered to users, Discord options)
    pub settings: Settings,
}

impl AppState {
    pub fn new(config: &Config, provider: Arc<dyn CompletionProvider>) -> Self {
        let registry = ServerRegistry::new(
            Arc::new(config.templates.clone()),
            config.record_defaults(),
        );
        Self {
            chat: ChatService::new(registry, provider, ChatOptions::from_settings(&config.settings)),
            settings: config.settings.clone(),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        self.chat.registry()
    }

    pub fn templates(&self) -> &TemplateSet {
        self.registry().templates()
    }
}
