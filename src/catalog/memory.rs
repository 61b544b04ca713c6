use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::Path;

use super::{CatalogError, CatalogQuery, CatalogSource};
use crate::log_debug;
use crate::types::CatalogEntry;

/// Catalog held in memory, seeded from a JSON array of entries
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(CatalogEntry::with_derived_values)
                    .collect(),
            ),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    pub fn load_json(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        log_debug!("Loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn usage_count(&self, id: u64) -> Option<u64> {
        self.entries
            .read()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.usage_count)
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut matches: Vec<CatalogEntry> = self
            .entries
            .read()
            .iter()
            .filter(|entry| query.preferences.admits(entry))
            .cloned()
            .collect();

        // Stable, so equal scores keep seed order
        matches.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
        matches.truncate(query.limit);
        Ok(matches)
    }

    async fn increment_usage(&self, id: u64) -> Result<(), CatalogError> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(CatalogError::NotFound(id))?;
        entry.usage_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchPreferences;

    const SEED: &str = r#"[
        {"id": 1, "name": "Lentil Soup", "ingredients": [{"name": "lentils", "amount": "200 g"}],
         "nutrition": {"calories": 320, "protein": 18, "carbs": 40, "fat": 6},
         "categories": {"vegan": true, "vegetarian": true}, "quality_score": 70},
        {"id": 2, "name": "Chicken Salad", "ingredients": [{"name": "chicken breast", "amount": "150 g"}],
         "nutrition": {"calories": 280, "protein": 32, "carbs": 8, "fat": 12},
         "categories": {"low_carb": true}, "quality_score": 90},
        {"id": 3, "name": "Veggie Curry", "ingredients": [{"name": "chickpeas", "amount": "1 can"}],
         "nutrition": {"calories": 410, "protein": 14, "carbs": 55, "fat": 14},
         "gi": 40, "categories": {"vegan": true, "vegetarian": true}, "quality_score": 85}
    ]"#;

    #[tokio::test]
    async fn test_query_orders_filters_and_limits() {
        let catalog = InMemoryCatalog::from_json_str(SEED).expect("seed parses");
        assert_eq!(catalog.len(), 3);

        let all = catalog
            .query(&CatalogQuery {
                limit: 10,
                preferences: SearchPreferences::default(),
            })
            .await
            .expect("query succeeds");
        let ids: Vec<u64> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let vegan = catalog
            .query(&CatalogQuery {
                limit: 1,
                preferences: SearchPreferences {
                    vegan: true,
                    ..Default::default()
                },
            })
            .await
            .expect("query succeeds");
        assert_eq!(vegan.len(), 1);
        assert_eq!(vegan[0].id, 3);
    }

    #[tokio::test]
    async fn test_seed_gets_derived_values() {
        let catalog = InMemoryCatalog::from_json_str(SEED).expect("seed parses");
        let entries = catalog
            .query(&CatalogQuery {
                limit: 10,
                preferences: SearchPreferences::default(),
            })
            .await
            .expect("query succeeds");
        let soup = entries.iter().find(|e| e.id == 1).expect("soup present");
        assert_eq!(soup.ke, Some(4.0));
        assert_eq!(soup.gi, 50);
        assert_eq!(soup.gl, Some(20.0));
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let catalog = InMemoryCatalog::from_json_str(SEED).expect("seed parses");
        catalog.increment_usage(2).await.expect("entry exists");
        catalog.increment_usage(2).await.expect("entry exists");
        assert_eq!(catalog.usage_count(2), Some(2));
        assert!(matches!(
            catalog.increment_usage(99).await,
            Err(CatalogError::NotFound(99))
        ));
    }

    #[test]
    fn test_load_json_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, SEED).expect("write seed");
        let catalog = InMemoryCatalog::load_json(&path).expect("loads");
        assert!(!catalog.is_empty());
        assert!(matches!(
            InMemoryCatalog::load_json(&dir.path().join("missing.json")),
            Err(CatalogError::Io(_))
        ));
    }
}
