#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM provider abstraction for single-shot completions.
//!
//! Supports `OpenAI` (and any `OpenAI`-compatible server via `base_url`)
//! and Anthropic Claude. Callers send a system instruction plus a user
//! payload and get text back; [`parse_json_object`] turns that text into a
//! typed value. No retries happen here: a failed call is reported once and
//! the caller decides how to fall back.

pub mod providers;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use providers::{CompletionRequest, LlmProvider, create_provider};

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Parses the JSON object contained in a model response.
///
/// Models sometimes wrap the object in markdown fences or add a sentence
/// before it, so this parses the span from the first `{` to the last `}`.
///
/// # Errors
///
/// Returns [`AiError::Provider`] if the text has no object span, or
/// [`AiError::Json`] if the span does not deserialize into `T`.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let start = text.find('{');
    let end = text.rfind('}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(serde_json::from_str(&text[start..=end])?),
        _ => Err(AiError::Provider {
            message: format!(
                "Response contains no JSON object ({} chars)",
                text.chars().count()
            ),
        }),
    }
}
