use std::fmt::Write;

use crate::types::GenerationRequest;

/// Render the generation prompt for a request.
///
/// The output is fully determined by the request: no timestamps, no ids.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let unit = request.carb_unit();
    let field = unit.field_name();

    let mut prompt = String::from(
        "You are an experienced chef and nutrition expert who writes recipes for people \
        managing diabetes. Respond with a single JSON array and nothing else.\n\n",
    );

    writeln!(
        prompt,
        "Create {} different recipes using these available ingredients: {}.",
        request.recipe_count(),
        request.ingredients().join(", ")
    )
    .expect("writing to a String cannot fail");
    writeln!(prompt, "Each recipe serves {} people.", request.servings())
        .expect("writing to a String cannot fail");
    writeln!(
        prompt,
        "Write all text in {}.",
        request.language().prompt_name()
    )
    .expect("writing to a String cannot fail");

    if !request.diet_tags().is_empty() {
        writeln!(
            prompt,
            "Every recipe must satisfy these dietary requirements: {}.",
            request.diet_tags().join(", ")
        )
        .expect("writing to a String cannot fail");
    }

    writeln!(
        prompt,
        "\nReport carbohydrates as {unit} ({}), rounded to one decimal.",
        unit.formula()
    )
    .expect("writing to a String cannot fail");

    prompt.push_str("\nUse exactly this structure for each recipe:\n");
    writeln!(
        prompt,
        r#"{{
  "name": "Recipe name",
  "description": "One or two sentences",
  "difficulty": 1,
  "cooking_time": "25 min",
  "method": "Cooking method",
  "ingredients": [
    {{"name": "ingredient", "amount": "200 g", "carbs": 12.5}}
  ],
  "nutrition_per_serving": {{
    "calories": 450,
    "protein": 30,
    "carbs": 36,
    "fat": 15,
    "{field}": 3.6
  }},
  "used_ingredients": ["ingredient"],
  "leftover_tips": "How to use what is left over"
}}"#
    )
    .expect("writing to a String cannot fail");

    prompt.push_str(
        "\nRules:\n\
        - difficulty is an integer from 1 (easy) to 5 (expert)\n\
        - carbs values are grams of carbohydrate\n\
        - used_ingredients lists only ingredients from the available list\n\
        - do not add commentary before or after the JSON array\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CarbUnit, Language};

    fn request(unit: CarbUnit) -> GenerationRequest {
        GenerationRequest::builder(["chicken", "rice"])
            .servings(4)
            .recipe_count(2)
            .diet_tags(["low-carb"])
            .carb_unit(unit)
            .language(Language::De)
            .build()
            .expect("valid request")
    }

    #[test]
    fn test_prompt_embeds_request_fields() {
        let prompt = build_prompt(&request(CarbUnit::Be));
        assert!(prompt.contains("Create 2 different recipes"));
        assert!(prompt.contains("chicken, rice"));
        assert!(prompt.contains("serves 4 people"));
        assert!(prompt.contains("German"));
        assert!(prompt.contains("low-carb"));
        assert!(prompt.contains("BE = carbs/12"));
        assert!(prompt.contains("\"be\": 3.6"));
        assert!(!prompt.contains("\"ke\""));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = request(CarbUnit::Ke);
        let b = GenerationRequest::builder(["chicken", "rice"])
            .servings(4)
            .recipe_count(2)
            .diet_tags(["low-carb"])
            .carb_unit(CarbUnit::Ke)
            .language(Language::De)
            .build()
            .expect("valid request");
        assert_eq!(build_prompt(&a), build_prompt(&b));
    }

    #[test]
    fn test_prompt_without_diet_tags() {
        let request = GenerationRequest::builder(["eggs"])
            .build()
            .expect("valid request");
        let prompt = build_prompt(&request);
        assert!(!prompt.contains("dietary requirements"));
        assert!(prompt.contains("English"));
    }
}
