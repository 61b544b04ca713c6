//! Subscription tiers and the features they unlock.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Subscription tier of the caller, ordered from lowest to highest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Tier {
    /// Legacy accounts were stored as `demo` before the tier rework
    #[default]
    #[serde(alias = "demo")]
    #[strum(to_string = "free", serialize = "demo")]
    Free,
    Basic,
    Premium,
    Pro,
    BusinessSolo,
    BusinessTeam,
    BusinessPraxis,
}

impl Tier {
    /// Number of top-ranked catalog entries visible to this tier
    pub const fn catalog_size(self) -> usize {
        match self {
            Self::Free => 0,
            Self::Basic => 1_000,
            Self::Premium => 10_000,
            Self::Pro | Self::BusinessSolo | Self::BusinessTeam | Self::BusinessPraxis => 50_000,
        }
    }

    /// Whether catalog lookup is attempted at all for this tier
    pub const fn has_catalog_access(self) -> bool {
        self.catalog_size() > 0
    }

    /// Whether the hosted backend may be used for this tier
    pub const fn qualifies_for_fast_backend(self) -> bool {
        matches!(
            self,
            Self::Pro | Self::BusinessSolo | Self::BusinessTeam | Self::BusinessPraxis
        )
    }
}
