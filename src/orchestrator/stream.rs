use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use super::parser::parse_recipes;
use crate::admission::AdmissionPermit;
use crate::backends::FragmentStream;
use crate::error::GenerationError;
use crate::log_debug;
use crate::providers::Provider;
use crate::types::{CarbUnit, GeneratedRecipe};

/// Text fragments of a streaming generation, in arrival order.
///
/// The stream is finite and single-pass. It ends after the backend finishes,
/// after the first error, or when its cancellation token fires. Any admission
/// permit attached to it is released at that point, or when the stream is
/// dropped, whichever happens first.
///
/// Fragments are also accumulated so the complete text can be parsed into
/// recipes with [`RecipeStream::finish`].
pub struct RecipeStream {
    inner: FragmentStream,
    buffer: String,
    provider: Provider,
    carb_unit: CarbUnit,
    permit: Option<AdmissionPermit>,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    finished: bool,
}

impl RecipeStream {
    pub fn new(inner: FragmentStream, provider: Provider, carb_unit: CarbUnit) -> Self {
        Self {
            inner,
            buffer: String::new(),
            provider,
            carb_unit,
            permit: None,
            cancelled: None,
            finished: false,
        }
    }

    /// Hold `permit` until the stream ends
    #[must_use]
    pub fn with_permit(mut self, permit: AdmissionPermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// End the stream with [`GenerationError::Cancelled`] once `token` fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Text received so far
    pub fn accumulated(&self) -> &str {
        &self.buffer
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the remaining fragments and parse the full text into recipes
    pub async fn finish(mut self) -> Result<Vec<GeneratedRecipe>, GenerationError> {
        while let Some(fragment) = self.next().await {
            fragment?;
        }

        let raw = std::mem::take(&mut self.buffer);
        let provider = self.provider;
        let mut recipes =
            parse_recipes(&raw, self.carb_unit).map_err(|source| GenerationError::Parse {
                provider,
                source,
                raw,
            })?;
        for recipe in &mut recipes {
            recipe.provider = Some(provider);
        }
        Ok(recipes)
    }

    fn close(&mut self) {
        self.finished = true;
        self.cancelled = None;
        if let Some(permit) = self.permit.take() {
            permit.release();
        }
    }
}

impl Stream for RecipeStream {
    type Item = Result<String, GenerationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_mut()
            && cancelled.as_mut().poll(cx).is_ready()
        {
            log_debug!("Stream from {} cancelled by caller", this.provider);
            this.close();
            return Poll::Ready(Some(Err(GenerationError::Cancelled)));
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.buffer.push_str(&fragment);
                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.close();
                Poll::Ready(Some(Err(e.into())))
            }
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for RecipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeStream")
            .field("provider", &self.provider)
            .field("received", &self.buffer.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::AdmissionController;
    use crate::backends::BackendError;
    use futures::stream;
    use std::sync::Arc;

    fn fragments(parts: Vec<Result<String, BackendError>>) -> FragmentStream {
        stream::iter(parts).boxed()
    }

    const RECIPE: &str = r#"[{"name": "Omelette", "difficulty": 1, "nutrition_per_serving": {"carbs": 24}}]"#;

    #[tokio::test]
    async fn test_fragments_accumulate_and_parse() {
        let (head, tail) = RECIPE.split_at(20);
        let stream = RecipeStream::new(
            fragments(vec![Ok(head.to_string()), Ok(tail.to_string())]),
            Provider::Ollama,
            CarbUnit::Be,
        );
        let recipes = stream.finish().await.expect("parses");
        assert_eq!(recipes[0].name, "Omelette");
        assert_eq!(recipes[0].provider, Some(Provider::Ollama));
        assert_eq!(recipes[0].nutrition_per_serving.be, Some(2.0));
    }

    #[tokio::test]
    async fn test_permit_released_when_stream_ends() {
        let controller = Arc::new(AdmissionController::new(1));
        let permit = controller.try_admit("stream").expect("slot available");
        let mut stream = RecipeStream::new(
            fragments(vec![Ok("[".to_string())]),
            Provider::Ollama,
            CarbUnit::Ke,
        )
        .with_permit(permit);

        assert_eq!(stream.next().await.map(Result::ok), Some(Some("[".to_string())));
        assert_eq!(controller.in_flight(), 1);
        assert!(stream.next().await.is_none());
        assert_eq!(controller.in_flight(), 0);
        assert_eq!(stream.accumulated(), "[");
    }

    #[tokio::test]
    async fn test_cancellation_ends_stream_and_releases() {
        let controller = Arc::new(AdmissionController::new(1));
        let permit = controller.try_admit("stream").expect("slot available");
        let token = CancellationToken::new();
        let mut stream = RecipeStream::new(
            stream::pending::<Result<String, BackendError>>().boxed(),
            Provider::Ollama,
            CarbUnit::Ke,
        )
        .with_permit(permit)
        .with_cancellation(token.clone());

        token.cancel();
        assert!(matches!(
            stream.next().await,
            Some(Err(GenerationError::Cancelled))
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(controller.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_surfaces() {
        let stream = RecipeStream::new(
            fragments(vec![
                Ok("[".to_string()),
                Err(BackendError::Envelope {
                    provider: Provider::Ollama,
                    reason: "model not found".to_string(),
                }),
            ]),
            Provider::Ollama,
            CarbUnit::Ke,
        );
        assert!(matches!(
            stream.finish().await,
            Err(GenerationError::Backend(BackendError::Envelope { .. }))
        ));
    }
}
