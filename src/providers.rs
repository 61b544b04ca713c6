//! Text-generation provider configuration.
//!
//! Single source of truth for the supported backends and their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Hosted, fast, paid
    Gemini,
    /// Local, slow, capacity-limited
    Ollama,
}

impl Provider {
    /// All available providers
    pub const ALL: &'static [Provider] = &[Provider::Gemini, Provider::Ollama];

    /// Provider name as used in config files, logs and provider tags
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash-exp",
            Self::Ollama => "llama3.2",
        }
    }

    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// Request timeout; the local backend runs on small hardware and is far slower
    pub const fn default_timeout(&self) -> Duration {
        match self {
            Self::Gemini => Duration::from_secs(30),
            Self::Ollama => Duration::from_secs(180),
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub const fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GOOGLE_AI_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Environment variable overriding the configured model
    pub const fn model_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_MODEL",
            Self::Ollama => "OLLAMA_MODEL",
        }
    }

    /// Environment variable overriding the configured base URL
    pub const fn base_url_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_BASE_URL",
            Self::Ollama => "OLLAMA_BASE_URL",
        }
    }

    /// Only the local backend can emit incremental tokens
    pub const fn supports_streaming(&self) -> bool {
        matches!(self, Self::Ollama)
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .find(|p| p.name() == lower)
            .copied()
            .ok_or_else(|| ProviderError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Provider configuration error
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}. Supported: gemini, ollama")]
    Unknown(String),
    #[error("Invalid base URL for {provider}: {source}")]
    InvalidBaseUrl {
        provider: Provider,
        #[source]
        source: url::ParseError,
    },
}

/// Default sampling temperature for recipe generation
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default maximum number of output tokens
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Per-provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (loaded from env or config)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Model name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ProviderConfig {
    /// Create config with defaults for a provider
    pub fn with_defaults(provider: Provider) -> Self {
        Self {
            model: provider.default_model().to_string(),
            ..Self::default()
        }
    }

    /// Get effective model (configured or default)
    pub fn effective_model(&self, provider: Provider) -> &str {
        if self.model.is_empty() {
            provider.default_model()
        } else {
            &self.model
        }
    }

    /// Get effective base URL without a trailing slash
    pub fn effective_base_url(&self, provider: Provider) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn effective_timeout(&self, provider: Provider) -> Duration {
        self.timeout_secs
            .map_or_else(|| provider.default_timeout(), Duration::from_secs)
    }

    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn effective_max_output_tokens(&self) -> u32 {
        self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)
    }

    /// Check if this config has an API key set
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Validate the settings that would otherwise only fail at request time
    pub fn validate(&self, provider: Provider) -> Result<(), ProviderError> {
        url::Url::parse(self.effective_base_url(provider))
            .map_err(|source| ProviderError::InvalidBaseUrl { provider, source })?;
        Ok(())
    }
}
