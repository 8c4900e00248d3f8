//! Settings configuration loaded from TOML files.
//!
//! Non-sensitive configuration stored in the XDG config directory
//! (~/.config/aibud/config.toml). Every field has a default, so an empty file
//! is a valid configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# aibud configuration file
# Located at: ~/.config/aibud/config.toml
#
# This file contains non-sensitive configuration.
# Secrets are loaded from environment variables:
#   - DISCORD_BOT_TOKEN
#   - OPENAI_API_KEY (required when provider.kind = "openai")

[provider]
# "openai" (legacy completions endpoint) or "ollama"
kind = "openai"
# base_url = "https://api.openai.com"
timeout_seconds = 60

[generation]
max_tokens = 64
temperature = 0.7
presence_penalty = 1.0
frequency_penalty = 1.5
stop = ["\n", "\n\n"]

[conversation]
default_template = "normal"
default_model = "davinci"
# Transcripts are trimmed below this many characters before each turn
char_limit = 1000
placeholder = "You:"
bot_label = "AiBud"
# templates_path = "/etc/aibud/personalities.toml"

[[models]]
label = "GPT3-Davinci"
id = "davinci"

[[models]]
label = "GPT3-Curie"
id = "curie"

[[models]]
label = "GPT3-Babbage"
id = "babbage"

[discord]
enabled = true
# Register slash commands on a single guild (instant) instead of globally
# guild_id = 123456789012345678
trigger_prefix = "!ai"

[logging]
level = "info"
"#;

/// Completion backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Completion backend
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Parameters sent with every completion request
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Per-server conversation defaults
    #[serde(default)]
    pub conversation: ConversationSettings,

    /// Models offered through `/ai set-model`
    #[serde(default = "default_models")]
    pub models: Vec<ModelChoice>,

    /// Discord bot configuration
    #[serde(default)]
    pub discord: DiscordSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Completion backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Override the provider's default base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// HTTP timeout for one completion call
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Generation parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationSettings {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f64,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f64,

    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
}

/// Conversation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationSettings {
    /// Template selected for new servers
    #[serde(default = "default_template")]
    pub default_template: String,

    /// Model selected for new servers
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Character budget for a transcript before the user's turn is added
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,

    /// Speaker label in templates replaced by the first user's name
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Speaker label for the bot's turns
    #[serde(default = "default_bot_label")]
    pub bot_label: String,

    /// Replace the built-in templates with this TOML file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_path: Option<PathBuf>,
}

/// A model offered to users
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelChoice {
    /// Display name
    pub label: String,
    /// Engine identifier sent to the provider
    pub id: String,
}

/// Discord bot settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordSettings {
    /// Whether Discord bot is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Register slash commands on this guild only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,

    /// Stripped from the start of messages before they are sent
    #[serde(default = "default_trigger_prefix")]
    pub trigger_prefix: String,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    64
}

fn default_temperature() -> f64 {
    0.7
}

fn default_presence_penalty() -> f64 {
    1.0
}

fn default_frequency_penalty() -> f64 {
    1.5
}

fn default_stop() -> Vec<String> {
    vec!["\n".to_string(), "\n\n".to_string()]
}

fn default_template() -> String {
    "normal".to_string()
}

fn default_model() -> String {
    "davinci".to_string()
}

fn default_char_limit() -> usize {
    1000
}

fn default_placeholder() -> String {
    "You:".to_string()
}

fn default_bot_label() -> String {
    "AiBud".to_string()
}

fn default_models() -> Vec<ModelChoice> {
    [
        ("GPT3-Davinci", "davinci"),
        ("GPT3-Curie", "curie"),
        ("GPT3-Babbage", "babbage"),
    ]
    .into_iter()
    .map(|(label, id)| ModelChoice {
        label: label.to_string(),
        id: id.to_string(),
    })
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_trigger_prefix() -> String {
    "!ai".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderSettings::default(),
            generation: GenerationSettings::default(),
            conversation: ConversationSettings::default(),
            models: default_models(),
            discord: DiscordSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            presence_penalty: default_presence_penalty(),
            frequency_penalty: default_frequency_penalty(),
            stop: default_stop(),
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            default_template: default_template(),
            default_model: default_model(),
            char_limit: default_char_limit(),
            placeholder: default_placeholder(),
            bot_label: default_bot_label(),
            templates_path: None,
        }
    }
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            guild_id: None,
            trigger_prefix: default_trigger_prefix(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Settings {
    /// Load settings from the default config file, creating it if missing.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Path to the settings file (`AIBUD_CONFIG_DIR` overrides the XDG dir).
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("AIBUD_CONFIG_DIR") {
            return Ok(PathBuf::from(override_dir).join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("aibud");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)?;
        Ok(())
    }

    /// Look up a model choice by engine id.
    pub fn model_choice(&self, id: &str) -> Option<&ModelChoice> {
        self.models.iter().find(|choice| choice.id == id)
    }
}
