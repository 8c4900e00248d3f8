//! Configuration management for aibud.
//!
//! Secrets come from environment variables, settings from a TOML file.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `DISCORD_BOT_TOKEN` - Discord bot token
//! - `OPENAI_API_KEY` - OpenAI API key (only for `provider.kind = "openai"`)
//!
//! ## Settings (TOML File)
//! Located at `~/.config/aibud/config.toml` (or `$AIBUD_CONFIG_DIR/config.toml`):
//! ```toml
//! [provider]
//! kind = "openai"
//!
//! [conversation]
//! default_template = "normal"
//! default_model = "davinci"
//! char_limit = 1000
//!
//! [discord]
//! enabled = true
//! ```

mod secrets;
mod settings;

use crate::server::RecordDefaults;
use crate::templates::{TemplateError, TemplateSet};

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    ConversationSettings, DiscordSettings, GenerationSettings, LoggingSettings, ModelChoice,
    ProviderKind, ProviderSettings, Settings, SettingsError,
};

/// Load .env file if it exists
pub fn load_dotenv() {
    // Silently ignore errors (file might not exist)
    let _ = dotenvy::dotenv();
}

/// Combined configuration: secrets, settings and the template set they point at.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
    /// Personality templates (built-in or from `conversation.templates_path`)
    pub templates: TemplateSet,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Template error: {0}")]
    Templates(#[from] TemplateError),

    #[error("Default template '{0}' not found in the template set")]
    DefaultTemplateNotFound(String),

    #[error("Default model is not set")]
    DefaultModelNotSet,

    #[error("conversation.char_limit must be greater than zero")]
    InvalidCharLimit,

    #[error("Provider '{0}' has no configured API key")]
    ProviderNotConfigured(ProviderKind),
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed, the
    /// templates cannot be loaded, or the settings are inconsistent with the
    /// secrets and templates.
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;
        Self::from_parts(secrets, settings)
    }

    /// Validate and combine already-loaded secrets and settings.
    pub fn from_parts(secrets: Secrets, settings: Settings) -> Result<Self, ConfigError> {
        let templates = match &settings.conversation.templates_path {
            Some(path) => TemplateSet::load(path)?,
            None => TemplateSet::builtin()?,
        };

        let conversation = &settings.conversation;
        if !templates.contains(&conversation.default_template) {
            return Err(ConfigError::DefaultTemplateNotFound(
                conversation.default_template.clone(),
            ));
        }
        if conversation.default_model.trim().is_empty() {
            return Err(ConfigError::DefaultModelNotSet);
        }
        if conversation.char_limit == 0 {
            return Err(ConfigError::InvalidCharLimit);
        }
        if !secrets.has_provider(settings.provider.kind) {
            return Err(ConfigError::ProviderNotConfigured(settings.provider.kind));
        }

        Ok(Self {
            secrets,
            settings,
            templates,
        })
    }

    /// Defaults for newly created server records.
    pub fn record_defaults(&self) -> RecordDefaults {
        RecordDefaults {
            template: self.settings.conversation.default_template.clone(),
            model: self.settings.conversation.default_model.clone(),
        }
    }

    /// Get the OpenAI API key (if configured).
    pub fn openai_api_key(&self) -> Option<&str> {
        self.secrets.openai_api_key.as_deref()
    }
}
