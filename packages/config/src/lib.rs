#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Application configuration.
//!
//! All defaults (fallback location, default time window, model settings)
//! live in one [`AppConfig`] value that callers pass explicitly into the
//! query interpreter, the insight generator, and the pipeline. Nothing in
//! the workspace reads ambient global state besides [`AppConfig::load`].
//!
//! ```toml
//! [defaults]
//! state = "AL"
//! county = "Baldwin"
//! lookback_years = 3
//!
//! [ai]
//! provider = "openai"
//! model = "gpt-4o"
//! timeout_secs = 30
//!
//! [data]
//! directory = "data"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`AppConfig`].
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fallback location and time window.
    pub defaults: DefaultsConfig,
    /// Language-model settings.
    pub ai: AiConfig,
    /// Local data settings.
    pub data: DataConfig,
}

/// Defaults applied when a query leaves something unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Two-letter state used when the query names none.
    pub state: String,
    /// County used when the query names none.
    pub county: String,
    /// Length of the default time window ending today.
    pub lookback_years: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            state: "AL".to_string(),
            county: "Baldwin".to_string(),
            lookback_years: 3,
        }
    }
}

/// Language-model provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Explicit provider name (`"openai"` or `"anthropic"`). Detected from
    /// the available API keys when unset.
    pub provider: Option<String>,
    /// Model identifier. Each provider has its own default.
    pub model: Option<String>,
    /// Base URL for `OpenAI`-compatible servers.
    pub base_url: Option<String>,
    /// `OpenAI` API key.
    pub openai_api_key: Option<String>,
    /// Anthropic API key.
    pub anthropic_api_key: Option<String>,
    /// Sampling temperature for query interpretation.
    pub interpret_temperature: f32,
    /// Sampling temperature for insight generation.
    pub insight_temperature: f32,
    /// Fixed per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Maximum tokens the model may generate per completion.
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            base_url: None,
            openai_api_key: None,
            anthropic_api_key: None,
            interpret_temperature: 0.1,
            insight_temperature: 0.5,
            timeout_secs: 30,
            max_tokens: 2048,
        }
    }
}

impl AiConfig {
    /// Returns `true` when at least one provider has credentials.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.openai_api_key.as_deref().is_some_and(|k| !k.is_empty())
            || self.anthropic_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Local data settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the CSV tables read by the data source.
    pub directory: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                log::info!("Loaded config from {}", path.display());
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies overrides from a key lookup (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(state) = get("CLIMATEBUD_DEFAULT_STATE") {
            self.defaults.state = state.to_uppercase();
        }
        if let Some(county) = get("CLIMATEBUD_DEFAULT_COUNTY") {
            self.defaults.county = county;
        }
        if let Some(dir) = get("CLIMATEBUD_DATA_DIR") {
            self.data.directory = PathBuf::from(dir);
        }
        if let Some(provider) = get("AI_PROVIDER") {
            self.ai.provider = Some(provider);
        }
        if let Some(model) = get("AI_MODEL") {
            self.ai.model = Some(model);
        }
        if let Some(base_url) = get("AI_BASE_URL") {
            self.ai.base_url = Some(base_url);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.ai.anthropic_api_key = Some(key);
        }
    }
}
