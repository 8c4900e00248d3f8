//! OpenAI legacy completions client (`/v1/completions`).

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{CompletionProvider, CompletionRequest, ProviderError, body_preview};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI completions API client.
#[derive(Clone)]
pub struct OpenAiCompletionsClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Request body for the Completions API
#[derive(Debug, Serialize)]
struct CompletionsBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
    presence_penalty: f64,
    frequency_penalty: f64,
    stop: &'a [String],
}

/// Completions API response
#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
}

/// Error envelope returned on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiCompletionsClient {
    /// Create a new client. `base_url` defaults to the public OpenAI API.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        })
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/completions", base)
        } else {
            format!("{}/v1/completions", base)
        }
    }

    fn build_body(request: &CompletionRequest) -> CompletionsBody<'_> {
        CompletionsBody {
            model: &request.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            stop: &request.stop,
        }
    }

    fn parse_response(body: &str) -> Result<String, ProviderError> {
        let response: CompletionsResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::InvalidFormat(format!(
                "Failed to parse completions response: {e}\nBody preview: {}",
                body_preview(body)
            ))
        })?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .unwrap_or_default())
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body_preview(body).to_string())
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompletionsClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = self.completions_url();
        debug!(model = %request.model, prompt_chars = request.prompt.chars().count(), "POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&Self::build_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        Self::parse_response(&body)
    }
}
