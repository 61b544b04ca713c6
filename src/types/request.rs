//! Generation request and its validating builder

use serde::Serialize;
use std::collections::HashSet;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use super::tier::Tier;
use super::units::{CarbUnit, Language};
use crate::error::GenerationError;

pub const MIN_SERVINGS: u8 = 1;
pub const MAX_SERVINGS: u8 = 10;
pub const DEFAULT_SERVINGS: u8 = 2;
pub const MAX_RECIPE_COUNT: u8 = 5;
pub const DEFAULT_RECIPE_COUNT: u8 = 3;

/// How results are delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GenerationMode {
    /// Complete, parsed result in one response
    #[default]
    Batch,
    /// Incremental text fragments from the local backend
    Streaming,
}

/// An immutable, validated request for recipes.
///
/// Only obtainable through [`GenerationRequestBuilder::build`], so every
/// instance has a non-empty ingredient list, an in-range serving count and
/// exactly one carbohydrate unit.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    id: Uuid,
    ingredients: Vec<String>,
    servings: u8,
    recipe_count: u8,
    diet_tags: Vec<String>,
    carb_unit: CarbUnit,
    language: Language,
    tier: Tier,
    mode: GenerationMode,
}

impl GenerationRequest {
    pub fn builder<I, S>(ingredients: I) -> GenerationRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GenerationRequestBuilder::new(ingredients)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    pub fn servings(&self) -> u8 {
        self.servings
    }

    pub fn recipe_count(&self) -> u8 {
        self.recipe_count
    }

    pub fn diet_tags(&self) -> &[String] {
        &self.diet_tags
    }

    pub fn carb_unit(&self) -> CarbUnit {
        self.carb_unit
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }
}

/// Builder collecting request fields before validation
#[derive(Debug, Clone)]
pub struct GenerationRequestBuilder {
    id: Option<Uuid>,
    ingredients: Vec<String>,
    servings: u8,
    recipe_count: u8,
    diet_tags: Vec<String>,
    carb_unit: CarbUnit,
    language: Language,
    tier: Tier,
    mode: GenerationMode,
}

impl GenerationRequestBuilder {
    pub fn new<I, S>(ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            servings: DEFAULT_SERVINGS,
            recipe_count: DEFAULT_RECIPE_COUNT,
            diet_tags: Vec::new(),
            carb_unit: CarbUnit::default(),
            language: Language::default(),
            tier: Tier::default(),
            mode: GenerationMode::default(),
        }
    }

    #[must_use]
    pub fn request_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn servings(mut self, servings: u8) -> Self {
        self.servings = servings;
        self
    }

    #[must_use]
    pub fn recipe_count(mut self, count: u8) -> Self {
        self.recipe_count = count;
        self
    }

    #[must_use]
    pub fn diet_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.diet_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn carb_unit(mut self, unit: CarbUnit) -> Self {
        self.carb_unit = unit;
        self
    }

    #[must_use]
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate and freeze the request
    pub fn build(self) -> Result<GenerationRequest, GenerationError> {
        let ingredients = normalize_names(self.ingredients);
        if ingredients.is_empty() {
            return Err(GenerationError::Validation(
                "At least one ingredient is required".to_string(),
            ));
        }

        if !(MIN_SERVINGS..=MAX_SERVINGS).contains(&self.servings) {
            return Err(GenerationError::Validation(format!(
                "Servings must be between {MIN_SERVINGS} and {MAX_SERVINGS}, got {}",
                self.servings
            )));
        }

        if !(1..=MAX_RECIPE_COUNT).contains(&self.recipe_count) {
            return Err(GenerationError::Validation(format!(
                "Recipe count must be between 1 and {MAX_RECIPE_COUNT}, got {}",
                self.recipe_count
            )));
        }

        Ok(GenerationRequest {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            ingredients,
            servings: self.servings,
            recipe_count: self.recipe_count,
            diet_tags: normalize_names(self.diet_tags),
            carb_unit: self.carb_unit,
            language: self.language,
            tier: self.tier,
            mode: self.mode,
        })
    }
}

/// Trim, drop blanks and collapse case-insensitive duplicates, keeping first spelling
fn normalize_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}
