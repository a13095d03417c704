//! Risk tiers: a five-step reading of a final percentage, with thresholds chosen
//! per condition.

use crate::types::{Condition, ConditionRiskSet};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
    /// The classifier output could not be read; no tier applies.
    Unknown,
}

impl RiskTier {
    /// A short recommendation suitable for a presenter.
    pub fn advice(self) -> &'static str {
        match self {
            RiskTier::VeryHigh => "Very high risk - prompt medical consultation is recommended",
            RiskTier::High => "High risk - lifestyle changes and regular check-ups are recommended",
            RiskTier::Moderate => "Moderate risk - consider exercise and dietary adjustments",
            RiskTier::Low => "Low risk - keep up healthy habits",
            RiskTier::VeryLow => "Very low risk - current state looks good",
            RiskTier::Unknown => "Risk unknown - the prediction could not be interpreted",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::VeryLow => "VERY LOW",
            RiskTier::Low => "LOW",
            RiskTier::Moderate => "MODERATE",
            RiskTier::High => "HIGH",
            RiskTier::VeryHigh => "VERY HIGH",
            RiskTier::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Strict lower bounds of the upper four tiers for one condition.
///
/// A value above `very_high` is very high, above `high` is high, and so on; a value
/// at or below `low` is very low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierCuts {
    pub very_high: f64,
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl TierCuts {
    pub const fn new(very_high: f64, high: f64, moderate: f64, low: f64) -> Self {
        Self {
            very_high,
            high,
            moderate,
            low,
        }
    }

    pub fn classify(&self, percentage: f64) -> RiskTier {
        if percentage > self.very_high {
            RiskTier::VeryHigh
        } else if percentage > self.high {
            RiskTier::High
        } else if percentage > self.moderate {
            RiskTier::Moderate
        } else if percentage > self.low {
            RiskTier::Low
        } else {
            RiskTier::VeryLow
        }
    }

    fn is_descending(&self) -> bool {
        self.very_high >= self.high && self.high >= self.moderate && self.moderate >= self.low
    }
}

/// Per-condition tier cut-offs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierThresholds {
    pub hypertension: TierCuts,
    pub obesity: TierCuts,
    pub diabetes: TierCuts,
    pub hyperlipidemia: TierCuts,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            hypertension: TierCuts::new(90.0, 70.0, 50.0, 35.0),
            obesity: TierCuts::new(80.0, 50.0, 40.0, 20.0),
            diabetes: TierCuts::new(70.0, 60.0, 50.0, 20.0),
            hyperlipidemia: TierCuts::new(70.0, 60.0, 40.0, 25.0),
        }
    }
}

/// A tier for every condition, keyed like [`ConditionRiskSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierSet {
    pub hypertension: RiskTier,
    pub obesity: RiskTier,
    pub diabetes: RiskTier,
    pub hyperlipidemia: RiskTier,
}

impl TierSet {
    pub fn unknown() -> Self {
        Self {
            hypertension: RiskTier::Unknown,
            obesity: RiskTier::Unknown,
            diabetes: RiskTier::Unknown,
            hyperlipidemia: RiskTier::Unknown,
        }
    }

    pub fn get(&self, condition: Condition) -> RiskTier {
        match condition {
            Condition::Hypertension => self.hypertension,
            Condition::Obesity => self.obesity,
            Condition::Diabetes => self.diabetes,
            Condition::Hyperlipidemia => self.hyperlipidemia,
        }
    }
}

impl TierThresholds {
    pub fn cuts(&self, condition: Condition) -> &TierCuts {
        match condition {
            Condition::Hypertension => &self.hypertension,
            Condition::Obesity => &self.obesity,
            Condition::Diabetes => &self.diabetes,
            Condition::Hyperlipidemia => &self.hyperlipidemia,
        }
    }

    pub fn classify(&self, risks: &ConditionRiskSet) -> TierSet {
        let tier = |condition| self.cuts(condition).classify(risks.get(condition));
        TierSet {
            hypertension: tier(Condition::Hypertension),
            obesity: tier(Condition::Obesity),
            diabetes: tier(Condition::Diabetes),
            hyperlipidemia: tier(Condition::Hyperlipidemia),
        }
    }

    /// Returns the first condition whose cut-offs are not in descending order.
    pub fn check(&self) -> Result<(), String> {
        match Condition::ALL
            .into_iter()
            .find(|&condition| !self.cuts(condition).is_descending())
        {
            Some(condition) => Err(format!(
                "tier cut-offs for {condition} must satisfy very_high >= high >= moderate >= low"
            )),
            None => Ok(()),
        }
    }
}
