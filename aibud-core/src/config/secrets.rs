//! Secrets configuration loaded from environment variables only.
//!
//! API keys and tokens never live in the settings file.

use std::env;

use super::settings::ProviderKind;

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Discord bot token (env: DISCORD_BOT_TOKEN)
    pub discord_bot_token: Option<String>,

    /// OpenAI API key (env: OPENAI_API_KEY)
    pub openai_api_key: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// A `.env` file is loaded first if present (development convenience).
    pub fn from_env() -> Result<Self, SecretsError> {
        super::load_dotenv();

        Self::from_env_inner()
    }

    /// Internal method to load from environment without loading .env
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        Ok(Self {
            discord_bot_token: non_empty_var("DISCORD_BOT_TOKEN"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
        })
    }

    /// Check if the given provider has what it needs to authenticate
    pub fn has_provider(&self, provider: ProviderKind) -> bool {
        match provider {
            ProviderKind::OpenAi => self.openai_api_key.is_some(),
            ProviderKind::Ollama => true,
        }
    }

    /// Discord token, or an error naming the missing variable
    pub fn require_discord_token(&self) -> Result<&str, SecretsError> {
        self.discord_bot_token
            .as_deref()
            .ok_or_else(|| SecretsError::MissingSecret("DISCORD_BOT_TOKEN".to_string()))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that modify environment variables must not run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            env::remove_var("DISCORD_BOT_TOKEN");
            env::remove_var("OPENAI_API_KEY");
        }
    }

    #[test]
    fn test_load_all_secrets() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("DISCORD_BOT_TOKEN", "discord-token");
            env::set_var("OPENAI_API_KEY", "sk-test");
        }

        let secrets = Secrets::from_env_inner().unwrap();
        assert_eq!(secrets.discord_bot_token.as_deref(), Some("discord-token"));
        assert_eq!(secrets.openai_api_key.as_deref(), Some("sk-test"));
        assert!(secrets.has_provider(ProviderKind::OpenAi));
        assert_eq!(secrets.require_discord_token().unwrap(), "discord-token");
    }

    #[test]
    fn test_missing_secrets() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        let secrets = Secrets::from_env_inner().unwrap();
        assert!(secrets.discord_bot_token.is_none());
        assert!(!secrets.has_provider(ProviderKind::OpenAi));
        assert!(secrets.has_provider(ProviderKind::Ollama));

        let err = secrets.require_discord_token().unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));
    }

    #[test]
    fn test_blank_values_are_missing() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("OPENAI_API_KEY", "   ");
        }

        let secrets = Secrets::from_env_inner().unwrap();
        assert!(secrets.openai_api_key.is_none());
        clear_env();
    }
}
