//! Scoring configuration: every tunable constant of the engine in one TOML document.
//!
//! A missing file section (or a missing key inside one) falls back to the built-in
//! default, so a config only needs to name what it changes. Unknown keys are errors.

use crate::adjust::AdjustmentConfig;
use crate::tier::TierThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub adjustments: AdjustmentConfig,
    pub tiers: TierThresholds,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ScoringConfig {
    /// Rejects configurations the adjustment chain cannot use.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.adjustments.obesity.check().map_err(ConfigError::Invalid)?;
        self.tiers.check().map_err(ConfigError::Invalid)?;
        let lifestyle = &self.adjustments.lifestyle;
        if [lifestyle.smoking, lifestyle.drinking, lifestyle.exercise]
            .iter()
            .any(|delta| !delta.is_finite() || *delta < 0.0)
        {
            return Err(ConfigError::Invalid(
                "lifestyle deltas are magnitudes and must be finite and non-negative".into(),
            ));
        }
        let age = &self.adjustments.age;
        if !(age.baseline_age.is_finite()
            && age.age_cap.is_finite()
            && age.points_per_year.is_finite()
            && age.hypertension_factor.is_finite())
        {
            return Err(ConfigError::Invalid("age adjustment parameters must be finite".into()));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        log::info!("Loaded scoring configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
