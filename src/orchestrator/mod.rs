//! Backend selection, prompting and response parsing.
//!
//! Tiers that qualify use the hosted backend first and fall back to the local
//! backend when it fails. Everyone else goes straight to the local backend.
//! Only the local backend streams.

mod availability;
mod parser;
mod prompt;
mod stream;

pub use availability::{Availability, AvailabilityMonitor, refresh, spawn_monitor};
pub use parser::{ParseFailure, parse_recipes, strip_code_fence};
pub use prompt::build_prompt;
pub use stream::RecipeStream;

use std::sync::Arc;
use std::time::Duration;

use crate::backends::{BackendError, GeminiBackend, GenerationParams, OllamaBackend, TextBackend};
use crate::config::Config;
use crate::error::GenerationError;
use crate::providers::Provider;
use crate::types::{CarbUnit, GeneratedRecipe, GenerationRequest};
use crate::{log_debug, log_info, log_warn};

struct BackendSlot {
    backend: Arc<dyn TextBackend>,
    params: GenerationParams,
}

/// Chooses a backend per request and turns its output into recipes
pub struct ProviderOrchestrator {
    fast: Option<BackendSlot>,
    local: Option<BackendSlot>,
    local_availability: Availability,
    _monitor: Option<AvailabilityMonitor>,
}

/// Collects backends before the initial liveness probe
#[derive(Default)]
pub struct OrchestratorBuilder {
    fast: Option<BackendSlot>,
    local: Option<BackendSlot>,
    probe_interval: Option<Duration>,
}

impl OrchestratorBuilder {
    /// Hosted backend offered to qualifying tiers
    #[must_use]
    pub fn fast(mut self, backend: Arc<dyn TextBackend>, params: GenerationParams) -> Self {
        self.fast = Some(BackendSlot { backend, params });
        self
    }

    /// Capacity-limited backend available to every tier
    #[must_use]
    pub fn local(mut self, backend: Arc<dyn TextBackend>, params: GenerationParams) -> Self {
        self.local = Some(BackendSlot { backend, params });
        self
    }

    /// Re-probe the local backend on this period
    #[must_use]
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    /// Probe the local backend once and start the periodic monitor if requested
    pub async fn build(self) -> ProviderOrchestrator {
        let local_availability = Availability::new(false);
        let mut monitor = None;

        if let Some(local) = &self.local {
            let reachable = refresh(local.backend.as_ref(), &local_availability).await;
            if reachable {
                log_info!("{} backend available", local.backend.provider());
            } else {
                log_warn!("{} backend not reachable at startup", local.backend.provider());
            }

            if let Some(interval) = self.probe_interval.filter(|i| !i.is_zero()) {
                monitor = Some(spawn_monitor(
                    Arc::clone(&local.backend),
                    local_availability.clone(),
                    interval,
                ));
            }
        }

        ProviderOrchestrator {
            fast: self.fast,
            local: self.local,
            local_availability,
            _monitor: monitor,
        }
    }
}

impl ProviderOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Build the Gemini and Ollama backends described by `config`.
    ///
    /// Gemini is only wired in when an API key is present.
    pub async fn from_config(config: &Config) -> Result<Self, BackendError> {
        let mut builder = Self::builder();

        let gemini_config = config.provider_config(Provider::Gemini);
        if gemini_config.has_api_key() {
            let backend = GeminiBackend::new(&gemini_config)?;
            log_debug!("Gemini backend configured with model {}", backend.model());
            builder = builder.fast(Arc::new(backend), GenerationParams::from(&gemini_config));
        } else {
            log_debug!("No Gemini API key configured, hosted backend disabled");
        }

        let ollama_config = config.provider_config(Provider::Ollama);
        let backend = OllamaBackend::new(&ollama_config)?;
        log_debug!(
            "Ollama backend configured at {} with model {}",
            backend.base_url(),
            backend.model()
        );
        builder = builder.local(Arc::new(backend), GenerationParams::from(&ollama_config));

        if let Some(interval) = config.probe.interval() {
            builder = builder.probe_interval(interval);
        }

        Ok(builder.build().await)
    }

    pub fn is_fast_configured(&self) -> bool {
        self.fast
            .as_ref()
            .is_some_and(|slot| slot.backend.is_configured())
    }

    /// Last known reachability of the local backend
    pub fn is_local_available(&self) -> bool {
        self.local.is_some() && self.local_availability.is_reachable()
    }

    /// Probe the local backend now instead of waiting for the monitor
    pub async fn recheck_local(&self) -> bool {
        match &self.local {
            Some(local) => refresh(local.backend.as_ref(), &self.local_availability).await,
            None => false,
        }
    }

    /// Generate recipes for `request` in one piece
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedRecipe>, GenerationError> {
        let prompt = build_prompt(request);
        let unit = request.carb_unit();

        if request.tier().qualifies_for_fast_backend()
            && let Some(fast) = self.fast.as_ref().filter(|s| s.backend.is_configured())
        {
            match self.run(fast, &prompt, unit).await {
                Ok(recipes) => return Ok(recipes),
                Err(err) if !self.is_local_available() => {
                    log_warn!(
                        "{} failed and no fallback is reachable: {err}",
                        fast.backend.provider()
                    );
                    return Err(match err {
                        parse @ GenerationError::Parse { .. } => parse,
                        other => GenerationError::ProviderUnavailable(format!(
                            "{} failed ({other}) and the local backend is not reachable",
                            fast.backend.provider()
                        )),
                    });
                }
                Err(err) => {
                    log_warn!(
                        "{} failed, falling back to local backend: {err}",
                        fast.backend.provider()
                    );
                }
            }
        }

        let local = self.available_local()?;
        self.run(local, &prompt, unit).await
    }

    /// Start a streaming generation on the local backend
    pub async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<RecipeStream, GenerationError> {
        let local = self.available_local()?;
        let provider = local.backend.provider();
        if !provider.supports_streaming() {
            return Err(BackendError::StreamingUnsupported(provider).into());
        }
        let prompt = build_prompt(request);

        let fragments = local
            .backend
            .generate_stream(&prompt, &local.params)
            .await
            .inspect_err(|e| self.note_failure(provider, e))?;

        log_debug!("Streaming generation started on {provider}");
        Ok(RecipeStream::new(fragments, provider, request.carb_unit()))
    }

    fn available_local(&self) -> Result<&BackendSlot, GenerationError> {
        match &self.local {
            Some(local) if self.local_availability.is_reachable() => Ok(local),
            Some(local) => Err(GenerationError::ProviderUnavailable(format!(
                "{} backend is not reachable",
                local.backend.provider()
            ))),
            None => Err(GenerationError::ProviderUnavailable(
                "no local backend configured".to_string(),
            )),
        }
    }

    async fn run(
        &self,
        slot: &BackendSlot,
        prompt: &str,
        unit: CarbUnit,
    ) -> Result<Vec<GeneratedRecipe>, GenerationError> {
        let provider = slot.backend.provider();
        let raw = slot
            .backend
            .generate(prompt, &slot.params)
            .await
            .inspect_err(|e| self.note_failure(provider, e))?;

        let mut recipes = parse_recipes(&raw, unit).map_err(|source| {
            log_debug!("Unparseable {provider} output ({} bytes)", raw.len());
            GenerationError::Parse {
                provider,
                source,
                raw: raw.clone(),
            }
        })?;

        for recipe in &mut recipes {
            recipe.provider = Some(provider);
        }
        log_info!("{provider} generated {} recipes", recipes.len());
        Ok(recipes)
    }

    fn note_failure(&self, provider: Provider, err: &BackendError) {
        let is_local = self
            .local
            .as_ref()
            .is_some_and(|l| l.backend.provider() == provider);
        if is_local && err.is_unreachable() && self.local_availability.set(false) {
            log_warn!("Marking {provider} unreachable after failed call: {err}");
        }
    }
}

impl std::fmt::Debug for ProviderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOrchestrator")
            .field("fast", &self.fast.as_ref().map(|s| s.backend.provider()))
            .field("local", &self.local.as_ref().map(|s| s.backend.provider()))
            .field("local_reachable", &self.local_availability.is_reachable())
            .finish()
    }
}
