use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{BackendError, GenerationParams, TextBackend, http_client, status_error};
use crate::log_debug;
use crate::providers::{Provider, ProviderConfig};

const PROVIDER: Provider = Provider::Gemini;

/// Hosted Gemini backend
pub struct GeminiBackend {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl GeminiBackend {
    pub fn new(config: &ProviderConfig) -> Result<Self, BackendError> {
        let timeout = config.effective_timeout(PROVIDER);
        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.effective_model(PROVIDER).to_string(),
            base_url: config.effective_base_url(PROVIDER).to_string(),
            timeout,
            client: http_client(PROVIDER, timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl TextBackend for GeminiBackend {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        if !self.is_configured() {
            return Err(BackendError::NotConfigured(PROVIDER));
        }

        let request_body = json!({
            "contents": [
                {
                    "parts": [
                        {"text": prompt}
                    ]
                }
            ],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_output_tokens
            }
        });

        log_debug!("Sending prompt to Gemini model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(PROVIDER, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Envelope {
                provider: PROVIDER,
                reason: e.to_string(),
            })?;

        // { "candidates": [ { "content": { "parts": [ { "text": "..." } ] } } ] }
        response_body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::Envelope {
                provider: PROVIDER,
                reason: "missing candidates[0].content.parts[0].text".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_api_key() {
        let backend = GeminiBackend::new(&ProviderConfig::default()).expect("client builds");
        assert!(!backend.is_configured());
        assert_eq!(backend.model(), "gemini-2.0-flash-exp");
        assert_eq!(
            backend.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let backend = GeminiBackend::new(&ProviderConfig::default()).expect("client builds");
        let result = backend
            .generate("prompt", &GenerationParams::default())
            .await;
        assert!(matches!(result, Err(BackendError::NotConfigured(Provider::Gemini))));
        assert!(!backend.probe().await);
    }
}
