use crate::admission::DEFAULT_MAX_CONCURRENT;
use crate::log_debug;
use crate::providers::{Provider, ProviderConfig};

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration structure for kitchen-helper
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Provider-specific configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Admission gate settings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum generations in flight at once
    pub max_concurrent: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Local backend liveness probing
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Seconds between probes; 0 probes only at startup
    pub interval_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl ProbeConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

/// Curated catalog location
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    /// JSON seed file; no catalog lookup happens without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let providers = Provider::ALL
            .iter()
            .map(|p| (p.name().to_string(), ProviderConfig::with_defaults(*p)))
            .collect();

        Self {
            admission: AdmissionConfig::default(),
            providers,
            probe: ProbeConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).with_context(|| {
            format!(
                "Invalid configuration file format in {}. Please check it for syntax errors.",
                path.display()
            )
        })?;
        log_debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        log_debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("kitchen-helper");
        path.push("config.toml");
        Ok(path)
    }

    /// Fill unset provider values from the environment.
    ///
    /// Values in the config file win over the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for provider in Provider::ALL {
            let entry = self
                .providers
                .entry(provider.name().to_string())
                .or_default();

            if entry.api_key.is_empty()
                && let Some(key) = provider.api_key_env().and_then(non_empty)
            {
                entry.api_key = key;
            }

            if let Some(model) = non_empty(provider.model_env())
                && (entry.model.is_empty() || entry.model == provider.default_model())
            {
                entry.model = model;
            }

            if entry.base_url.is_none() {
                entry.base_url = non_empty(provider.base_url_env());
            }
        }
    }

    /// Configuration for `provider`, with defaults when it has no section
    pub fn provider_config(&self, provider: Provider) -> ProviderConfig {
        self.providers
            .get(provider.name())
            .cloned()
            .unwrap_or_else(|| ProviderConfig::with_defaults(provider))
    }

    /// Check values that would otherwise only fail at request time
    pub fn validate(&self) -> Result<()> {
        if self.admission.max_concurrent == 0 {
            return Err(anyhow!(
                "admission.max_concurrent must be at least 1, otherwise every request is rejected"
            ));
        }

        for name in self.providers.keys() {
            let provider: Provider = name
                .parse()
                .with_context(|| format!("Unknown provider section [providers.{name}]"))?;
            self.provider_config(provider)
                .validate(provider)
                .with_context(|| format!("Invalid settings for {provider}"))?;
        }

        if let Some(seed) = &self.catalog.seed_path
            && !seed.exists()
        {
            return Err(anyhow!("Catalog seed file {} does not exist", seed.display()));
        }

        Ok(())
    }

    /// Update the configuration with new values
    pub fn update(
        &mut self,
        provider: Provider,
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
    ) {
        let entry = self
            .providers
            .entry(provider.name().to_string())
            .or_insert_with(|| ProviderConfig::with_defaults(provider));

        if let Some(key) = api_key {
            entry.api_key = key;
        }
        if let Some(model) = model {
            entry.model = model;
        }
        if let Some(url) = base_url {
            entry.base_url = Some(url);
        }
        if let Some(timeout) = timeout_secs {
            entry.timeout_secs = Some(timeout);
        }

        log_debug!("Configuration updated for {provider}");
    }
}
