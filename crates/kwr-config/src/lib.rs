//! Typed, validated configuration for the keyword-research pipeline.
//!
//! Settings load through a layered `figment` pipeline (defaults < file <
//! env, prefixed `KWR_`) into a single typed `Settings` record; unknown
//! keys are rejected at extraction and every field has an explicit default.
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_settings, load_settings_from_file, ConfigError, SettingsLoader};
pub use models::{
    ClusteringSettings, ExpansionSettings, OrchestratorSettings, ProviderSettings,
    RoadmapSettings, ScoringSettings, ScoringWeights, Settings, TeamMember, TeamRole,
    WeightProfile,
};
pub use validation::{validate_settings, ConfigValidator};
