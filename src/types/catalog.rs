//! Curated catalog entries and search preferences

use serde::{Deserialize, Serialize};

use super::units::{CarbUnit, glycemic_load};

/// Difficulty grading used by the curated catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogDifficulty {
    #[default]
    #[serde(alias = "einfach")]
    Easy,
    #[serde(alias = "mittel")]
    Medium,
    #[serde(alias = "fortgeschritten")]
    Advanced,
}

/// Ingredient line of a catalog recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogIngredient {
    pub name: String,
    #[serde(default)]
    pub amount: String,
}

/// Nutrient facts per serving
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: u32,
    pub protein: f64,
    /// Carbohydrate grams
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
}

/// Category flags assigned during curation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct CategoryFlags {
    pub low_carb: bool,
    pub low_gi: bool,
    pub diabetic_friendly: bool,
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub quick: bool,
}

fn default_servings() -> u8 {
    2
}

fn default_glycemic_index() -> u8 {
    50
}

/// A curated, pre-scored recipe.
///
/// Quality score and category flags are fixed at seeding time; the only
/// field this crate ever changes is `usage_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<CatalogIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default = "default_servings")]
    pub servings: u8,
    #[serde(default)]
    pub prep_time_min: u32,
    #[serde(default)]
    pub cook_time_min: u32,
    #[serde(default)]
    pub difficulty: CatalogDifficulty,
    pub nutrition: NutritionFacts,
    #[serde(default)]
    pub ke: Option<f64>,
    #[serde(default)]
    pub be: Option<f64>,
    #[serde(default = "default_glycemic_index")]
    pub gi: u8,
    #[serde(default)]
    pub gl: Option<f64>,
    #[serde(default)]
    pub categories: CategoryFlags,
    #[serde(default)]
    pub quality_score: f64,
    #[serde(default)]
    pub usage_count: u64,
}

impl CatalogEntry {
    pub fn total_time_min(&self) -> u32 {
        self.prep_time_min + self.cook_time_min
    }

    /// Carbohydrate units per serving, falling back to the derived value
    pub fn carb_units(&self, unit: CarbUnit) -> f64 {
        let stored = match unit {
            CarbUnit::Ke => self.ke,
            CarbUnit::Be => self.be,
        };
        stored.unwrap_or_else(|| unit.from_carbs(self.nutrition.carbs))
    }

    /// Fill in derived KE, BE and glycemic load values missing from seed data
    #[must_use]
    pub fn with_derived_values(mut self) -> Self {
        let carbs = self.nutrition.carbs;
        self.ke.get_or_insert_with(|| CarbUnit::Ke.from_carbs(carbs));
        self.be.get_or_insert_with(|| CarbUnit::Be.from_carbs(carbs));
        let gi = self.gi;
        self.gl.get_or_insert_with(|| glycemic_load(gi, carbs));
        self
    }
}

/// Hard filters applied to catalog candidates.
///
/// Every flag set to `true` must also be set on the entry; ceilings are only
/// enforced when present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SearchPreferences {
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub low_carb: bool,
    pub low_gi: bool,
    pub diabetic_friendly: bool,
    pub quick: bool,
    /// Maximum carbohydrate grams per serving
    pub max_carbs: Option<f64>,
    /// Maximum glycemic index
    pub max_gi: Option<u8>,
}

impl SearchPreferences {
    /// Whether an entry passes every active filter
    pub fn admits(&self, entry: &CatalogEntry) -> bool {
        let flags = &entry.categories;
        let required = [
            (self.vegetarian, flags.vegetarian),
            (self.vegan, flags.vegan),
            (self.gluten_free, flags.gluten_free),
            (self.low_carb, flags.low_carb),
            (self.low_gi, flags.low_gi),
            (self.diabetic_friendly, flags.diabetic_friendly),
            (self.quick, flags.quick),
        ];
        if required.iter().any(|&(wanted, has)| wanted && !has) {
            return false;
        }

        if let Some(max_carbs) = self.max_carbs
            && entry.nutrition.carbs > max_carbs
        {
            return false;
        }

        self.max_gi.is_none_or(|max_gi| entry.gi <= max_gi)
    }

    /// Preferences implied by free-text diet tags such as `vegan` or `low-carb`
    pub fn from_diet_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut prefs = Self::default();
        for tag in tags {
            match tag.as_ref().to_lowercase().replace(['-', ' '], "_").as_str() {
                "vegetarian" => prefs.vegetarian = true,
                "vegan" => prefs.vegan = true,
                "gluten_free" => prefs.gluten_free = true,
                "low_carb" => prefs.low_carb = true,
                "low_gi" | "low_glycemic" => prefs.low_gi = true,
                "diabetic" | "diabetic_friendly" => prefs.diabetic_friendly = true,
                "quick" => prefs.quick = true,
                _ => {}
            }
        }
        prefs
    }

    /// Combine two sets of preferences, keeping every flag and the tighter ceilings
    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        let tighter = |a: Option<f64>, b: Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            vegetarian: self.vegetarian || other.vegetarian,
            vegan: self.vegan || other.vegan,
            gluten_free: self.gluten_free || other.gluten_free,
            low_carb: self.low_carb || other.low_carb,
            low_gi: self.low_gi || other.low_gi,
            diabetic_friendly: self.diabetic_friendly || other.diabetic_friendly,
            quick: self.quick || other.quick,
            max_carbs: tighter(self.max_carbs, other.max_carbs),
            max_gi: match (self.max_gi, other.max_gi) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }
}
