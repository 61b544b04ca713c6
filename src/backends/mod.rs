//! Text-generation backends.
//!
//! Each backend turns a rendered prompt into raw text. Parsing that text into
//! recipes is the orchestrator's job.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

use crate::providers::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, Provider, ProviderConfig};

mod gemini;
mod ollama;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl From<&ProviderConfig> for GenerationParams {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            temperature: config.effective_temperature(),
            max_output_tokens: config.effective_max_output_tokens(),
        }
    }
}

/// Finite, one-pass sequence of text fragments
pub type FragmentStream = BoxStream<'static, Result<String, BackendError>>;

/// Errors raised while talking to a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{provider} request failed: {message}")]
    Connection { provider: Provider, message: String },
    #[error("{provider} timed out after {}s", .after.as_secs())]
    Timeout { provider: Provider, after: Duration },
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },
    #[error("{provider} response envelope was malformed: {reason}")]
    Envelope { provider: Provider, reason: String },
    #[error("{0} does not support streaming")]
    StreamingUnsupported(Provider),
    #[error("{0} is not configured")]
    NotConfigured(Provider),
}

impl BackendError {
    pub fn provider(&self) -> Provider {
        match self {
            Self::Connection { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Status { provider, .. }
            | Self::Envelope { provider, .. } => *provider,
            Self::StreamingUnsupported(provider) | Self::NotConfigured(provider) => *provider,
        }
    }

    /// Whether the backend itself looks unreachable, as opposed to misbehaving
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    pub(crate) fn from_reqwest(provider: Provider, timeout: Duration, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider,
                after: timeout,
            }
        } else {
            Self::Connection {
                provider,
                message: err.to_string(),
            }
        }
    }
}

/// A text-generation backend
#[async_trait]
pub trait TextBackend: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether the backend has everything it needs to accept requests
    fn is_configured(&self) -> bool {
        true
    }

    /// Produce the complete response text for `prompt`
    async fn generate(&self, prompt: &str, params: &GenerationParams)
    -> Result<String, BackendError>;

    /// Produce the response incrementally
    async fn generate_stream(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<FragmentStream, BackendError> {
        Err(BackendError::StreamingUnsupported(self.provider()))
    }

    /// Cheap liveness check
    async fn probe(&self) -> bool {
        self.is_configured()
    }
}

/// Build an HTTP client with the provider's request timeout
pub(crate) fn http_client(
    provider: Provider,
    timeout: Duration,
) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Connection {
            provider,
            message: format!("Failed to build HTTP client: {e}"),
        })
}

/// Build an HTTP client that only bounds connection setup.
///
/// Callers apply their own per-request or per-chunk deadlines.
pub(crate) fn streaming_http_client(
    provider: Provider,
    connect_timeout: Duration,
) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| BackendError::Connection {
            provider,
            message: format!("Failed to build HTTP client: {e}"),
        })
}

/// Read a non-success response into a status error
pub(crate) async fn status_error(provider: Provider, response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Status {
        provider,
        status,
        body: body.chars().take(500).collect(),
    }
}
