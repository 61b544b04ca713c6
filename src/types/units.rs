//! Carbohydrate units and output language

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Carbohydrate exchange unit used for diabetic meal planning.
///
/// Exactly one unit is requested per generation; the prompt and the parsed
/// nutrition block only ever carry that unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum CarbUnit {
    /// Kohlenhydrateinheit, 10 g carbohydrate
    #[default]
    #[serde(rename = "KE", alias = "ke")]
    #[strum(to_string = "KE")]
    Ke,
    /// Broteinheit, 12 g carbohydrate
    #[serde(rename = "BE", alias = "be")]
    #[strum(to_string = "BE")]
    Be,
}

impl CarbUnit {
    pub const fn grams_per_unit(self) -> f64 {
        match self {
            Self::Ke => 10.0,
            Self::Be => 12.0,
        }
    }

    /// Key used for this unit inside a nutrition block
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Ke => "ke",
            Self::Be => "be",
        }
    }

    /// Human readable conversion formula embedded in prompts
    pub const fn formula(self) -> &'static str {
        match self {
            Self::Ke => "KE = carbs/10",
            Self::Be => "BE = carbs/12",
        }
    }

    /// Convert carbohydrate grams to this unit, rounded to one decimal
    pub fn from_carbs(self, carbs_grams: f64) -> f64 {
        round_one_decimal(carbs_grams / self.grams_per_unit())
    }
}

/// Glycemic load of a portion: GI * available carbs / 100
pub fn glycemic_load(glycemic_index: u8, carbs_grams: f64) -> f64 {
    round_one_decimal(f64::from(glycemic_index) * carbs_grams / 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Output language for generated recipes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    /// Language name as written into the prompt
    pub const fn prompt_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::De => "German",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carb_unit_conversion() {
        assert!((CarbUnit::Ke.from_carbs(45.0) - 4.5).abs() < f64::EPSILON);
        assert!((CarbUnit::Be.from_carbs(8.0) - 0.7).abs() < f64::EPSILON);
        assert!((CarbUnit::Be.from_carbs(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_carb_unit_parsing() {
        assert_eq!("ke".parse::<CarbUnit>().ok(), Some(CarbUnit::Ke));
        assert_eq!("BE".parse::<CarbUnit>().ok(), Some(CarbUnit::Be));
        assert!("grams".parse::<CarbUnit>().is_err());
        assert_eq!(CarbUnit::Be.to_string(), "BE");
    }

    #[test]
    fn test_glycemic_load() {
        assert!((glycemic_load(15, 8.0) - 1.2).abs() < f64::EPSILON);
        assert!((glycemic_load(70, 50.0) - 35.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_language_prompt_name() {
        assert_eq!("de".parse::<Language>().ok(), Some(Language::De));
        assert_eq!(Language::De.prompt_name(), "German");
        assert_eq!(Language::default().prompt_name(), "English");
    }
}
