use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use std::time::Duration;

use super::{
    BackendError, FragmentStream, GenerationParams, TextBackend, status_error,
    streaming_http_client,
};
use crate::providers::{Provider, ProviderConfig};
use crate::{log_debug, log_warn};

const PROVIDER: Provider = Provider::Ollama;

/// Liveness probes must answer quickly or the backend counts as down
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Local Ollama backend
pub struct OllamaBackend {
    base_url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

/// One line of `/api/generate` output, batch or streamed
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaBackend {
    pub fn new(config: &ProviderConfig) -> Result<Self, BackendError> {
        let timeout = config.effective_timeout(PROVIDER);
        Ok(Self {
            base_url: config.effective_base_url(PROVIDER).to_string(),
            model: config.effective_model(PROVIDER).to_string(),
            timeout,
            client: streaming_http_client(PROVIDER, timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": stream,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_output_tokens
            }
        });

        let mut builder = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload);
        // A stream is bounded per fragment instead of as a whole
        if !stream {
            builder = builder.timeout(self.timeout);
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| BackendError::Timeout {
                provider: PROVIDER,
                after: self.timeout,
            })?
            .map_err(|e| BackendError::from_reqwest(PROVIDER, self.timeout, &e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(PROVIDER, response).await)
        }
    }
}

#[async_trait]
impl TextBackend for OllamaBackend {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        log_debug!("Sending prompt to Ollama model {}", self.model);
        let response = self.post_generate(prompt, params, false).await?;

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_reqwest(PROVIDER, self.timeout, &e))?;
        let chunk: GenerateChunk =
            serde_json::from_str(&body).map_err(|e| BackendError::Envelope {
                provider: PROVIDER,
                reason: format!("response is not a generate result: {e}"),
            })?;

        match chunk.error {
            Some(error) => Err(BackendError::Envelope {
                provider: PROVIDER,
                reason: error,
            }),
            None => Ok(chunk.response),
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream, BackendError> {
        log_debug!("Streaming prompt to Ollama model {}", self.model);
        let response = self.post_generate(prompt, params, true).await?;
        Ok(decode_ndjson(response.bytes_stream(), self.timeout).boxed())
    }

    async fn probe(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log_warn!("Ollama not available: {e}");
                false
            }
        }
    }
}

type ByteStream<B> = Pin<Box<dyn Stream<Item = Result<B, reqwest::Error>> + Send>>;

struct NdjsonState<B> {
    inner: ByteStream<B>,
    buffer: Vec<u8>,
    timeout: Duration,
    eof: bool,
    finished: bool,
}

enum LineOutcome {
    Token { text: String, done: bool },
    Skip,
}

fn parse_line(line: &[u8]) -> Result<LineOutcome, BackendError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Ok(LineOutcome::Skip);
    }

    let chunk: GenerateChunk =
        serde_json::from_slice(trimmed).map_err(|e| BackendError::Envelope {
            provider: PROVIDER,
            reason: format!("invalid stream line: {e}"),
        })?;

    if let Some(error) = chunk.error {
        return Err(BackendError::Envelope {
            provider: PROVIDER,
            reason: error,
        });
    }

    Ok(LineOutcome::Token {
        text: chunk.response,
        done: chunk.done,
    })
}

/// Split a newline-delimited JSON byte stream into response tokens.
///
/// The stream ends at the first `"done": true` line, at end of input, or
/// after the first error. `timeout` bounds the wait for each network chunk,
/// so a slow but steady generation is never cut off.
fn decode_ndjson<S, B>(
    inner: S,
    timeout: Duration,
) -> impl Stream<Item = Result<String, BackendError>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = NdjsonState {
        inner: Box::pin(inner),
        buffer: Vec::new(),
        timeout,
        eof: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                match parse_line(&line) {
                    Ok(LineOutcome::Skip) => continue,
                    Ok(LineOutcome::Token { text, done }) => {
                        state.finished = done;
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), state));
                    }
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.eof {
                // Trailing line without a newline terminator
                if state.buffer.is_empty() {
                    return None;
                }
                state.buffer.push(b'\n');
                continue;
            }

            let Ok(next) = tokio::time::timeout(state.timeout, state.inner.next()).await else {
                state.finished = true;
                let err = BackendError::Timeout {
                    provider: PROVIDER,
                    after: state.timeout,
                };
                return Some((Err(err), state));
            };

            match next {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    let err = BackendError::from_reqwest(PROVIDER, state.timeout, &e);
                    return Some((Err(err), state));
                }
                None => state.eof = true,
            }
        }
    })
}
