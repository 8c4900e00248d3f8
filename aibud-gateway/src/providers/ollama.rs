//! Ollama client (`/api/generate`, raw mode).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{CompletionProvider, CompletionRequest, ProviderError, body_preview};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone)]
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    // The transcript is already a complete prompt; skip the model's chat template
    raw: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    num_predict: u32,
    temperature: f64,
    presence_penalty: f64,
    frequency_penalty: f64,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn build_body(request: &CompletionRequest) -> GenerateBody<'_> {
        GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            raw: true,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
                presence_penalty: request.presence_penalty,
                frequency_penalty: request.frequency_penalty,
                stop: &request.stop,
            },
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = self.generate_url();
        debug!(model = %request.model, "POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(&Self::build_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body_preview(&body).to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aibud_core::GenerationSettings;

    #[test]
    fn test_generate_url() {
        let client = OllamaClient::new(None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");

        let client =
            OllamaClient::new(Some("http://10.0.0.2:11434/".to_string()), Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.generate_url(), "http://10.0.0.2:11434/api/generate");
    }

    #[test]
    fn test_request_body() {
        let generation = GenerationSettings {
            max_tokens: 32,
            presence_penalty: 0.5,
            stop: vec!["\n".to_string()],
            ..GenerationSettings::default()
        };
        let request = CompletionRequest::new("llama3", "Desc.\nAna: hi\nAiBud: ", &generation);

        insta::assert_json_snapshot!(OllamaClient::build_body(&request), @r#"
        {
          "model": "llama3",
          "prompt": "Desc.\nAna: hi\nAiBud: ",
          "stream": false,
          "raw": true,
          "options": {
            "num_predict": 32,
            "temperature": 0.7,
            "presence_penalty": 0.5,
            "frequency_penalty": 1.5,
            "stop": [
              "\n"
            ]
          }
        }
        "#);
    }

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{"model":"llama3","response":" Not much!","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response, " Not much!");
    }
}
