//! kitchen-helper - recipe generation from the ingredients at hand
//!
//! Requests are served from a curated catalog when a good match exists and
//! otherwise generated by a hosted or local model, behind a small admission
//! gate that keeps the local model from being overloaded.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::too_many_arguments)] // CLI handlers mirror their flags
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod admission;
pub mod backends;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod providers;
pub mod types;

// Re-export important structs and functions for easier testing
pub use admission::{AdmissionController, AdmissionPermit, AdmissionSlot};
pub use catalog::{CatalogSearch, CatalogSource, InMemoryCatalog};
pub use config::Config;
pub use coordinator::{GenerationCoordinator, GenerationOutcome};
pub use error::GenerationError;
pub use orchestrator::{ProviderOrchestrator, RecipeStream};
pub use providers::{Provider, ProviderConfig};

pub use types::{
    CarbUnit, CatalogEntry, GeneratedRecipe, GenerationMode, GenerationRequest, Language,
    SearchPreferences, Tier,
};
