//! Entry point for recipe requests.
//!
//! A request is first matched against the catalog. On a miss it takes an
//! admission slot and goes to the orchestrator. The slot is released when
//! generation finishes, fails, or the caller's cancellation token fires.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionController;
use crate::catalog::CatalogSearch;
use crate::error::GenerationError;
use crate::orchestrator::{ProviderOrchestrator, RecipeStream};
use crate::types::{
    CatalogEntry, GeneratedRecipe, GenerationMode, GenerationRequest, SearchPreferences,
};
use crate::{log_debug, log_info, log_warn};

/// Where a batch result came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source")]
pub enum GenerationOutcome {
    #[serde(rename = "recipe_db")]
    Catalog { recipe: CatalogEntry },
    #[serde(rename = "ai_generated")]
    Generated { recipes: Vec<GeneratedRecipe> },
}

impl GenerationOutcome {
    pub fn is_catalog_hit(&self) -> bool {
        matches!(self, Self::Catalog { .. })
    }
}

pub struct GenerationCoordinator {
    admission: Arc<AdmissionController>,
    catalog: Option<CatalogSearch>,
    orchestrator: Arc<ProviderOrchestrator>,
}

impl GenerationCoordinator {
    pub fn new(
        admission: Arc<AdmissionController>,
        orchestrator: Arc<ProviderOrchestrator>,
    ) -> Self {
        Self {
            admission,
            catalog: None,
            orchestrator,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: CatalogSearch) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn orchestrator(&self) -> &Arc<ProviderOrchestrator> {
        &self.orchestrator
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Serve `request` from the catalog or by generating recipes.
    ///
    /// Diet tags on the request are added to `preferences` for the catalog
    /// lookup. Catalog failures are logged and treated as a miss.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        preferences: &SearchPreferences,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        if request.mode() == GenerationMode::Streaming {
            return Err(GenerationError::Validation(
                "Streaming requests must use generate_streaming".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        tracing::info!(
            request_id = %request.id(),
            tier = %request.tier(),
            ingredients = request.ingredients().len(),
            "recipe request received"
        );

        if let Some(entry) = self.lookup_catalog(request, preferences).await {
            return Ok(GenerationOutcome::Catalog { recipe: entry });
        }

        let request_id = request.id().to_string();
        let permit = self.admission.try_admit(&request_id)?;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log_info!("Request {request_id} cancelled, abandoning backend call");
                Err(GenerationError::Cancelled)
            }
            result = self.orchestrator.generate(request) => result,
        };
        permit.release();

        result.map(|recipes| GenerationOutcome::Generated { recipes })
    }

    /// Start streaming generation for `request`.
    ///
    /// The admission slot travels with the returned stream and is given back
    /// when the stream ends, is dropped, or `cancel` fires.
    pub async fn generate_streaming(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<RecipeStream, GenerationError> {
        if request.mode() == GenerationMode::Batch {
            return Err(GenerationError::Validation(
                "Batch requests must use generate".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let request_id = request.id().to_string();
        let permit = self.admission.try_admit(&request_id)?;

        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(GenerationError::Cancelled),
            stream = self.orchestrator.generate_stream(request) => stream,
        }?;

        log_debug!("Request {request_id} streaming from {}", stream.provider());
        Ok(stream.with_permit(permit).with_cancellation(cancel))
    }

    async fn lookup_catalog(
        &self,
        request: &GenerationRequest,
        preferences: &SearchPreferences,
    ) -> Option<CatalogEntry> {
        let catalog = self.catalog.as_ref()?;
        if !request.tier().has_catalog_access() {
            return None;
        }

        let preferences =
            preferences.merged(SearchPreferences::from_diet_tags(request.diet_tags()));
        match catalog.search(request, &preferences).await {
            Ok(hit) => hit,
            Err(e) => {
                log_warn!("Catalog lookup failed, generating instead: {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for GenerationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCoordinator")
            .field("admission", &self.admission.snapshot())
            .field("catalog", &self.catalog.is_some())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CatalogIngredient;

    #[test]
    fn test_outcome_serializes_with_source_tag() {
        let outcome = GenerationOutcome::Generated { recipes: vec![] };
        let value = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(value["source"], "ai_generated");

        let entry: CatalogEntry = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Omelette",
            "ingredients": [{"name": "eggs", "amount": "3"}],
            "nutrition": {"calories": 250, "protein": 18, "carbs": 2, "fat": 19}
        }))
        .expect("entry parses");
        assert_eq!(
            entry.ingredients,
            vec![CatalogIngredient {
                name: "eggs".to_string(),
                amount: "3".to_string()
            }]
        );
        assert_eq!(entry.nutrition.calories, 250);

        let outcome = GenerationOutcome::Catalog { recipe: entry };
        assert!(outcome.is_catalog_hit());
        let value = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(value["source"], "recipe_db");
        assert_eq!(value["recipe"]["id"], 7);
    }
}
