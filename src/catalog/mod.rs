//! Curated recipe catalog consulted before any generation is attempted

mod memory;
mod search;

pub use memory::InMemoryCatalog;
pub use search::{CatalogSearch, MIN_MATCH_RATIO, ingredient_match_ratio};

use async_trait::async_trait;

use crate::types::{CatalogEntry, SearchPreferences};

/// Slice of the catalog a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CatalogQuery {
    /// Maximum number of entries to return
    pub limit: usize,
    pub preferences: SearchPreferences,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog entry {0} not found")]
    NotFound(u64),
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid catalog data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Storage backing the catalog.
///
/// `query` returns entries passing every filter in `query.preferences`,
/// ordered by quality score descending, at most `query.limit` of them.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Record that `id` was served once
    async fn increment_usage(&self, id: u64) -> Result<(), CatalogError>;
}
