pub mod config;
pub mod notice;
pub mod registry;
pub mod server;
pub mod templates;
pub mod transcript;

// Config re-exports
pub use config::{
    Config,
    ConfigError,
    ConversationSettings,
    DiscordSettings,
    GenerationSettings,
    ModelChoice,
    ProviderKind,
    Secrets,
    SecretsError,
    Settings,
    SettingsError,
    load_dotenv,
};

// Conversation state re-exports
pub use notice::{Notice, NoticeKind, Reply};
pub use registry::{RecordHandle, ServerRegistry};
pub use server::{RecordDefaults, ServerId, ServerRecord, SetOutcome, StateError};
pub use templates::{TemplateError, TemplateSet};
