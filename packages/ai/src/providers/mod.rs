//! LLM provider abstraction and implementations.
//!
//! Supports `OpenAI` and Anthropic via a common trait.

pub mod anthropic;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use climatebud_config::AiConfig;

use crate::AiError;

/// A single completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// System instruction.
    pub system: &'a str,
    /// User payload.
    pub user: &'a str,
    /// Ask the provider to constrain output to a single JSON object.
    pub json_output: bool,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends one completion request and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails, times out, or the provider
    /// reports an error.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AiError>;
}

/// Creates an LLM provider from configuration.
///
/// If `provider` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `openai_api_key` set -> `OpenAI`
/// 2. `anthropic_api_key` set -> Anthropic Claude
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider(config: &AiConfig) -> Result<Arc<dyn LlmProvider>, AiError> {
    let provider = match config.provider.as_deref() {
        Some(name) => name.to_lowercase(),
        None => detect_provider(config)?.to_string(),
    };

    let timeout = Duration::from_secs(config.timeout_secs);
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    match provider.as_str() {
        "openai" | "gpt" => {
            let api_key = non_empty(config.openai_api_key.as_deref()).ok_or_else(|| {
                AiError::Config {
                    message: "OPENAI_API_KEY is not set".to_string(),
                }
            })?;
            let model = config.model.clone().unwrap_or_else(|| "gpt-4o".to_string());
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
            log::info!("Using OpenAI provider with model {model}");
            Ok(Arc::new(openai::OpenAiProvider::new(
                client,
                api_key.to_string(),
                model,
                base_url,
                config.max_tokens,
            )))
        }
        "anthropic" | "claude" => {
            let api_key = non_empty(config.anthropic_api_key.as_deref()).ok_or_else(|| {
                AiError::Config {
                    message: "ANTHROPIC_API_KEY is not set".to_string(),
                }
            })?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string());
            log::info!("Using Anthropic provider with model {model}");
            Ok(Arc::new(anthropic::AnthropicProvider::new(
                client,
                api_key.to_string(),
                model,
                config.max_tokens,
            )))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'openai' or 'anthropic'."),
        }),
    }
}

/// Picks a provider name from whichever API key is configured.
fn detect_provider(config: &AiConfig) -> Result<&'static str, AiError> {
    if non_empty(config.openai_api_key.as_deref()).is_some() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
        return Ok("openai");
    }

    if non_empty(config.anthropic_api_key.as_deref()).is_some() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Ok("anthropic");
    }

    Err(AiError::Config {
        message: "No AI credentials configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY."
            .to_string(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_is_config_error() {
        let err = create_provider(&AiConfig::default()).err().unwrap();
        assert!(matches!(err, AiError::Config { .. }));
    }

    #[test]
    fn explicit_provider_requires_its_key() {
        let config = AiConfig {
            provider: Some("anthropic".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..AiConfig::default()
        };
        assert!(matches!(
            create_provider(&config).err().unwrap(),
            AiError::Config { .. }
        ));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = AiConfig {
            provider: Some("mystery".to_string()),
            ..AiConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn detects_available_key() {
        let config = AiConfig {
            anthropic_api_key: Some("key".to_string()),
            ..AiConfig::default()
        };
        assert_eq!(detect_provider(&config).unwrap(), "anthropic");
        assert!(create_provider(&config).is_ok());
    }
}
