//! Domain types shared by the catalog, orchestrator and coordinator

mod catalog;
mod recipe;
mod request;
mod tier;
mod units;

pub use catalog::{
    CatalogDifficulty, CatalogEntry, CatalogIngredient, CategoryFlags, NutritionFacts,
    SearchPreferences,
};
pub use recipe::{GeneratedRecipe, NutritionPerServing, RecipeIngredient};
pub use request::{
    DEFAULT_RECIPE_COUNT, DEFAULT_SERVINGS, GenerationMode, GenerationRequest,
    GenerationRequestBuilder, MAX_RECIPE_COUNT, MAX_SERVINGS, MIN_SERVINGS,
};
pub use tier::Tier;
pub use units::{CarbUnit, Language, glycemic_load};
