//! `OpenAI` chat-completions provider implementation.

use serde::{Deserialize, Serialize};

use super::{CompletionRequest, LlmProvider};
use crate::AiError;

/// Default API root for `OpenAI`.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            api_key,
            model,
            base_url,
            max_tokens,
            client,
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: [OpenAiMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AiError> {
        let body = OpenAiRequest {
            model: &self.model,
            messages: [
                OpenAiMessage {
                    role: "system",
                    content: request.system,
                },
                OpenAiMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: self.max_tokens,
            response_format: request.json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&text).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {text}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: OpenAiResponse = serde_json::from_str(&text)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AiError::Provider {
                message: "No content in OpenAI response".to_string(),
            })?;

        log::debug!("OpenAI returned {} bytes", content.len());

        Ok(content)
    }
}
