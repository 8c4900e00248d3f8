//! Provider trait for abstracting text-completion backends.

use aibud_core::GenerationSettings;
use serde::Serialize;

/// Everything a backend needs for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        generation: &GenerationSettings,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: generation.max_tokens,
            temperature: generation.temperature,
            presence_penalty: generation.presence_penalty,
            frequency_penalty: generation.frequency_penalty,
            stop: generation.stop.clone(),
        }
    }
}

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

/// A text-completion backend.
///
/// Implementations return the generated text as-is; trimming and the
/// empty-text policy belong to the caller.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Complete `request.prompt` with `request.model`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Shorten a response body for error messages.
pub(crate) fn body_preview(body: &str) -> &str {
    if body.len() <= 500 {
        return body;
    }
    let mut end = 500;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
