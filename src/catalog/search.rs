use std::sync::Arc;

use super::{CatalogError, CatalogQuery, CatalogSource};
use crate::types::{CatalogEntry, GenerationRequest, SearchPreferences};
use crate::{log_debug, log_info, log_warn};

/// Minimum share of a recipe's ingredients the caller must be able to cover
pub const MIN_MATCH_RATIO: f64 = 0.5;

/// Share of `entry`'s ingredients matched by the requested names.
///
/// A requested name matches when it contains, or is contained in, any
/// catalog ingredient name, ignoring case. The count of matching requested
/// names is divided by the entry's ingredient count.
#[allow(clippy::cast_precision_loss)]
pub fn ingredient_match_ratio<S: AsRef<str>>(requested: &[S], entry: &CatalogEntry) -> f64 {
    if entry.ingredients.is_empty() {
        return 0.0;
    }

    let candidate_names: Vec<String> = entry
        .ingredients
        .iter()
        .map(|i| i.name.to_lowercase())
        .collect();

    let matched = requested
        .iter()
        .map(|name| name.as_ref().to_lowercase())
        .filter(|name| !name.is_empty())
        .filter(|name| {
            candidate_names.iter().any(|candidate| {
                candidate.contains(name.as_str()) || name.contains(candidate.as_str())
            })
        })
        .count();

    matched as f64 / candidate_names.len() as f64
}

/// Ranked lookup of a ready-made recipe for a request
#[derive(Clone)]
pub struct CatalogSearch {
    source: Arc<dyn CatalogSource>,
}

impl CatalogSearch {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }

    /// Highest-quality visible entry that covers enough of the request.
    ///
    /// Returns `Ok(None)` without querying the source when the caller's tier
    /// has no catalog access. A returned entry has had its usage counted once;
    /// a failure to record that usage is logged and does not discard the match.
    pub async fn search(
        &self,
        request: &GenerationRequest,
        preferences: &SearchPreferences,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let tier = request.tier();
        let limit = tier.catalog_size();
        if limit == 0 {
            log_debug!("Tier {tier} has no catalog access");
            return Ok(None);
        }

        let mut candidates = self
            .source
            .query(&CatalogQuery {
                limit,
                preferences: *preferences,
            })
            .await?;

        // Sources are expected to filter and order; enforce both here anyway
        candidates.retain(|entry| preferences.admits(entry));
        candidates.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
        candidates.truncate(limit);

        let Some(mut hit) = candidates
            .into_iter()
            .find(|entry| ingredient_match_ratio(request.ingredients(), entry) >= MIN_MATCH_RATIO)
        else {
            log_debug!(
                "No catalog match for [{}] in tier {tier}",
                request.ingredients().join(", ")
            );
            return Ok(None);
        };

        match self.source.increment_usage(hit.id).await {
            Ok(()) => hit.usage_count += 1,
            Err(e) => log_warn!("Failed to record usage of catalog entry {}: {e}", hit.id),
        }

        log_info!(
            "Catalog hit: {} (id {}, score {})",
            hit.name,
            hit.id,
            hit.quality_score
        );
        Ok(Some(hit))
    }
}

impl std::fmt::Debug for CatalogSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSearch").finish_non_exhaustive()
    }
}
