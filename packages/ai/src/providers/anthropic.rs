//! Anthropic Claude provider implementation.

use serde::{Deserialize, Serialize};

use super::{CompletionRequest, LlmProvider};
use crate::AiError;

/// Appended to the system prompt when the caller needs strict JSON, since
/// the messages API has no response-format switch.
const JSON_ONLY_SUFFIX: &str =
    "\n\nRespond with a single JSON object and nothing else: no prose, no code fences.";

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            api_key,
            model,
            max_tokens,
            client,
        }
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    temperature: f32,
    messages: [AnthropicMessage<'a>; 1],
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API error response.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AiError> {
        let system = if request.json_output {
            format!("{}{JSON_ONLY_SUFFIX}", request.system)
        } else {
            request.system.to_string()
        };

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &system,
            temperature: request.temperature,
            messages: [AnthropicMessage {
                role: "user",
                content: request.user,
            }],
        };

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err: AnthropicError =
                serde_json::from_str(&text).unwrap_or_else(|_| AnthropicError {
                    error: AnthropicErrorDetail {
                        message: format!("HTTP {status}: {text}"),
                    },
                });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: AnthropicResponse = serde_json::from_str(&text)?;

        let content = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if content.trim().is_empty() {
            return Err(AiError::Provider {
                message: "No text content in Anthropic response".to_string(),
            });
        }

        log::debug!("Anthropic returned {} bytes", content.len());

        Ok(content)
    }
}
