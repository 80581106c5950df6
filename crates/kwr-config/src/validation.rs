use crate::loader::ConfigError;
use crate::models::{
    ClusteringSettings, ExpansionSettings, OrchestratorSettings, RoadmapSettings, ScoringSettings,
    Settings,
};

/// Configuration validation trait, one impl per settings sub-section.
pub trait ConfigValidator<T> {
    fn validate(&self, config: &T) -> Result<(), ConfigError>;
}

pub struct SettingsValidator;

impl ConfigValidator<Settings> for SettingsValidator {
    fn validate(&self, config: &Settings) -> Result<(), ConfigError> {
        if config.market.is_empty() {
            return Err(ConfigError::ValidationError("market must not be empty".into()));
        }
        if config.language.is_empty() {
            return Err(ConfigError::ValidationError(
                "language must not be empty".into(),
            ));
        }
        ExpansionSettingsValidator.validate(&config.expansion)?;
        ClusteringSettingsValidator.validate(&config.clustering)?;
        ScoringSettingsValidator.validate(&config.scoring)?;
        RoadmapSettingsValidator.validate(&config.roadmap)?;
        OrchestratorSettingsValidator.validate(&config.orchestrator)?;
        Ok(())
    }
}

pub struct ExpansionSettingsValidator;

impl ConfigValidator<ExpansionSettings> for ExpansionSettingsValidator {
    fn validate(&self, config: &ExpansionSettings) -> Result<(), ConfigError> {
        if !(10..=200).contains(&config.max_dream100) {
            return Err(ConfigError::ValidationError(format!(
                "max_dream100 {} must be between 10 and 200",
                config.max_dream100
            )));
        }
        if !(5..=20).contains(&config.max_tier2_per_dream) {
            return Err(ConfigError::ValidationError(format!(
                "max_tier2_per_dream {} must be between 5 and 20",
                config.max_tier2_per_dream
            )));
        }
        if !(5..=20).contains(&config.max_tier3_per_tier2) {
            return Err(ConfigError::ValidationError(format!(
                "max_tier3_per_tier2 {} must be between 5 and 20",
                config.max_tier3_per_tier2
            )));
        }
        Ok(())
    }
}

pub struct ClusteringSettingsValidator;

impl ConfigValidator<ClusteringSettings> for ClusteringSettingsValidator {
    fn validate(&self, config: &ClusteringSettings) -> Result<(), ConfigError> {
        if !(0.1..=0.9).contains(&config.similarity_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "similarity_threshold {} must be in [0.1, 0.9]",
                config.similarity_threshold
            )));
        }
        if config.min_cluster_size < 2 {
            return Err(ConfigError::ValidationError(
                "min_cluster_size must be at least 2".into(),
            ));
        }
        if config.max_cluster_size <= config.min_cluster_size {
            return Err(ConfigError::ValidationError(
                "max_cluster_size must be greater than min_cluster_size".into(),
            ));
        }
        if (config.intent_weight + config.semantic_weight - 1.0).abs() > 0.01 {
            return Err(ConfigError::ValidationError(
                "intent_weight + semantic_weight must sum to ~1.0".into(),
            ));
        }
        Ok(())
    }
}

pub struct ScoringSettingsValidator;

impl ConfigValidator<ScoringSettings> for ScoringSettingsValidator {
    fn validate(&self, config: &ScoringSettings) -> Result<(), ConfigError> {
        if !(0.5..=0.9).contains(&config.quick_win_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "quick_win_threshold {} must be in [0.5, 0.9]",
                config.quick_win_threshold
            )));
        }
        for (name, profile) in [
            ("dream100", config.weights.dream100),
            ("tier2", config.weights.tier2),
            ("tier3", config.weights.tier3),
        ] {
            if !profile.is_valid() {
                return Err(ConfigError::ValidationError(format!(
                    "scoring weight profile '{name}' must sum to 1.0 ± 0.01 with nonnegative weights (sum={})",
                    profile.sum()
                )));
            }
        }
        Ok(())
    }
}

pub struct RoadmapSettingsValidator;

impl ConfigValidator<RoadmapSettings> for RoadmapSettingsValidator {
    fn validate(&self, config: &RoadmapSettings) -> Result<(), ConfigError> {
        if !(1..=100).contains(&config.posts_per_month) {
            return Err(ConfigError::ValidationError(
                "posts_per_month must be between 1 and 100".into(),
            ));
        }
        if !(1..=24).contains(&config.duration_months) {
            return Err(ConfigError::ValidationError(
                "duration_months must be between 1 and 24".into(),
            ));
        }
        if !(0.1..=0.9).contains(&config.pillar_ratio) {
            return Err(ConfigError::ValidationError(
                "pillar_ratio must be between 0.1 and 0.9".into(),
            ));
        }
        for member in &config.team_members {
            if !(1..=50).contains(&member.capacity) {
                return Err(ConfigError::ValidationError(format!(
                    "team member '{}' capacity must be between 1 and 50",
                    member.name
                )));
            }
        }
        Ok(())
    }
}

pub struct OrchestratorSettingsValidator;

impl ConfigValidator<OrchestratorSettings> for OrchestratorSettingsValidator {
    fn validate(&self, config: &OrchestratorSettings) -> Result<(), ConfigError> {
        if config.max_total_keywords > 50_000 {
            return Err(ConfigError::ValidationError(
                "max_total_keywords must not exceed 50,000".into(),
            ));
        }
        if config.budget_limit < 10.0 {
            return Err(ConfigError::ValidationError(
                "budget_limit must be at least 10".into(),
            ));
        }
        Ok(())
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    SettingsValidator.validate(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn rejects_unbalanced_weight_profile() {
        let mut settings = Settings::default();
        settings.scoring.weights.dream100.volume = 0.9;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn rejects_budget_below_floor() {
        let mut settings = Settings::default();
        settings.orchestrator.budget_limit = 1.0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn rejects_cluster_size_bounds_violation() {
        let mut settings = Settings::default();
        settings.clustering.max_cluster_size = 1;
        settings.clustering.min_cluster_size = 3;
        assert!(validate_settings(&settings).is_err());
    }
}
