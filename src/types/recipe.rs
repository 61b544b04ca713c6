//! Recipes produced by a generation backend

use serde::{Deserialize, Serialize};

use super::units::CarbUnit;
use crate::providers::Provider;

/// Ingredient line of a generated recipe
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub name: String,
    #[serde(default)]
    pub amount: String,
    /// Carbohydrate grams contributed by this ingredient
    #[serde(default)]
    pub carbs: f64,
}

/// Nutrition values per serving
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct NutritionPerServing {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ke: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub be: Option<f64>,
}

impl NutritionPerServing {
    pub fn carb_units(&self, unit: CarbUnit) -> Option<f64> {
        match unit {
            CarbUnit::Ke => self.ke,
            CarbUnit::Be => self.be,
        }
    }

    /// Keep only the requested unit, deriving it from carbs when the backend omitted it
    pub fn restrict_to_unit(&mut self, unit: CarbUnit) {
        let value = self
            .carb_units(unit)
            .unwrap_or_else(|| unit.from_carbs(self.carbs));
        match unit {
            CarbUnit::Ke => {
                self.ke = Some(value);
                self.be = None;
            }
            CarbUnit::Be => {
                self.be = Some(value);
                self.ke = None;
            }
        }
    }
}

/// A recipe generated for one request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratedRecipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 1 = easy, 5 = expert
    pub difficulty: u8,
    #[serde(default)]
    pub cooking_time: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub nutrition_per_serving: NutritionPerServing,
    #[serde(default)]
    pub used_ingredients: Vec<String>,
    #[serde(default, alias = "leftover_tip")]
    pub leftover_tips: String,
    /// Backend that produced the recipe, set after parsing
    #[serde(default, rename = "ai_provider", skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrict_to_requested_unit() {
        let mut nutrition = NutritionPerServing {
            carbs: 36.0,
            ke: Some(3.6),
            be: Some(3.0),
            ..Default::default()
        };
        nutrition.restrict_to_unit(CarbUnit::Be);
        assert_eq!(nutrition.be, Some(3.0));
        assert_eq!(nutrition.ke, None);
    }

    #[test]
    fn test_missing_unit_is_derived() {
        let mut nutrition = NutritionPerServing {
            carbs: 45.0,
            ..Default::default()
        };
        nutrition.restrict_to_unit(CarbUnit::Ke);
        assert_eq!(nutrition.ke, Some(4.5));
    }

    #[test]
    fn test_provider_tag_serializes_as_ai_provider() {
        let recipe = GeneratedRecipe {
            name: "Stir-Fry".to_string(),
            description: String::new(),
            difficulty: 2,
            cooking_time: "20 min".to_string(),
            method: "Wok".to_string(),
            ingredients: vec![],
            nutrition_per_serving: NutritionPerServing::default(),
            used_ingredients: vec![],
            leftover_tips: String::new(),
            provider: Some(Provider::Ollama),
        };
        let value = serde_json::to_value(&recipe).expect("serialize recipe");
        assert_eq!(value["ai_provider"], "ollama");
    }
}
