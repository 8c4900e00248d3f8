pub mod ollama;
pub mod openai;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use aibud_core::{Config, ProviderKind};

pub use ollama::OllamaClient;
pub use openai::OpenAiCompletionsClient;
pub use provider::{CompletionProvider, CompletionRequest, ProviderError};

/// Build the completion client selected by `provider.kind`.
pub fn build_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    let provider = &config.settings.provider;
    let timeout = Duration::from_secs(provider.timeout_seconds);

    match provider.kind {
        ProviderKind::OpenAi => {
            // Config::load already checked the key exists for this kind
            let api_key = config.openai_api_key().unwrap_or_default();
            let client = OpenAiCompletionsClient::new(api_key, provider.base_url.clone(), timeout)?;
            Ok(Arc::new(client))
        }
        ProviderKind::Ollama => {
            let client = OllamaClient::new(provider.base_url.clone(), timeout)?;
            Ok(Arc::new(client))
        }
    }
}
