use regex::Regex;
use std::sync::LazyLock;

use crate::log_debug;
use crate::types::{CarbUnit, GeneratedRecipe};

/// Fenced block with an optional language tag, e.g. ```` ```json ````.
/// Truncated output may lack the closing fence.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)(?:```|\z)")
        .expect("Failed to compile code fence regex pattern")
});

/// Why backend output could not be turned into recipes
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response contained no recipes")]
    Empty,
    #[error("recipe {index} violates the schema: {reason}")]
    Schema { index: usize, reason: String },
}

/// Remove one surrounding code fence, if present
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |inner| inner.as_str().trim())
}

/// Parse backend text into recipes carrying only `unit` in their nutrition block
pub fn parse_recipes(raw: &str, unit: CarbUnit) -> Result<Vec<GeneratedRecipe>, ParseFailure> {
    let body = strip_code_fence(raw);

    let mut recipes: Vec<GeneratedRecipe> = if body.starts_with('{') {
        // Some models return a lone object despite being asked for an array
        log_debug!("Backend returned a single recipe object");
        vec![serde_json::from_str(body)?]
    } else {
        serde_json::from_str(body)?
    };

    if recipes.is_empty() {
        return Err(ParseFailure::Empty);
    }

    for (index, recipe) in recipes.iter_mut().enumerate() {
        if recipe.name.trim().is_empty() {
            return Err(ParseFailure::Schema {
                index,
                reason: "name is empty".to_string(),
            });
        }
        if !(1..=5).contains(&recipe.difficulty) {
            return Err(ParseFailure::Schema {
                index,
                reason: format!("difficulty {} is outside 1-5", recipe.difficulty),
            });
        }
        recipe.nutrition_per_serving.restrict_to_unit(unit);
    }

    Ok(recipes)
}
