//! Errors surfaced by the generation pipeline

use crate::backends::BackendError;
use crate::orchestrator::ParseFailure;
use crate::providers::Provider;

/// Failure of a generation request.
///
/// A catalog miss is not represented here; it is an `Option::None` that the
/// coordinator turns into a generation attempt.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Malformed request, rejected before any backend is touched
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Every admission slot is taken; the caller should retry later
    #[error("Generation capacity exhausted ({current}/{max} in flight)")]
    AdmissionRejected { current: usize, max: usize },

    /// No backend can serve the request
    #[error("No provider available: {0}")]
    ProviderUnavailable(String),

    /// Backend output did not match the recipe schema.
    ///
    /// `raw` keeps the backend text for diagnostics and is never part of the
    /// display string.
    #[error("Failed to parse {provider} output: {source}")]
    Parse {
        provider: Provider,
        #[source]
        source: ParseFailure,
        raw: String,
    },

    /// The caller went away before generation finished
    #[error("Generation cancelled")]
    Cancelled,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl GenerationError {
    /// Whether the same request may succeed if retried shortly
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AdmissionRejected { .. })
    }

    /// Raw backend output retained for diagnostics, if any
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Text that can be shown to an end user.
    ///
    /// `catalog_fallback` indicates whether the caller can offer catalog-only
    /// results instead.
    pub fn user_message(&self, catalog_fallback: bool) -> String {
        match self {
            Self::Validation(reason) => reason.clone(),
            Self::AdmissionRejected { current, max } => format!(
                "Too many recipes are being generated right now ({current}/{max}). Please wait a moment and try again."
            ),
            Self::ProviderUnavailable(_) | Self::Parse { .. } | Self::Backend(_) => {
                if catalog_fallback {
                    "Recipe generation failed. You can still pick a recipe from the catalog."
                        .to_string()
                } else {
                    "Recipe generation failed. Please try again later.".to_string()
                }
            }
            Self::Cancelled => "Recipe generation was cancelled.".to_string(),
        }
    }
}
