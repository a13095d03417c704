// ========================================================================================
//
//                       CORE DATA TYPES FOR THE RISKSCOPE ENGINE
//
// ========================================================================================
//
// This module is the canonical dictionary for the types that cross the boundaries
// between the feature deriver, the classifier adapter, the adjustment chain and the
// pipeline orchestrator.
//
// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ========================================================================================
//                                  THE CONDITION SET
// ========================================================================================

/// The closed set of conditions the engine predicts.
///
/// The declaration order is the canonical order: it is the order in which a
/// multi-output classifier emits its per-condition outputs, and the order in which
/// every report lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Hypertension,
    Obesity,
    Diabetes,
    Hyperlipidemia,
}

impl Condition {
    /// All conditions, in canonical order.
    pub const ALL: [Condition; 4] = [
        Condition::Hypertension,
        Condition::Obesity,
        Condition::Diabetes,
        Condition::Hyperlipidemia,
    ];

    /// The number of known conditions.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this condition in canonical order.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Condition::Hypertension => 0,
            Condition::Obesity => 1,
            Condition::Diabetes => 2,
            Condition::Hyperlipidemia => 3,
        }
    }

    /// The stable snake_case name used as a JSON key and a TSV column suffix.
    pub fn name(self) -> &'static str {
        match self {
            Condition::Hypertension => "hypertension",
            Condition::Obesity => "obesity",
            Condition::Diabetes => "diabetes",
            Condition::Hyperlipidemia => "hyperlipidemia",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ========================================================================================
//                               THE BOUNDED RISK MAPPING
// ========================================================================================

/// Lower bound of every risk percentage.
pub const MIN_RISK: f64 = 0.0;
/// Upper bound of every risk percentage.
pub const MAX_RISK: f64 = 100.0;

/// Clamps a percentage into `[MIN_RISK, MAX_RISK]`. Non-finite values map to zero.
#[inline]
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_RISK, MAX_RISK)
    } else {
        MIN_RISK
    }
}

/// A fixed-key mapping from every [`Condition`] to a risk percentage.
///
/// The only way to write a value is through [`ConditionRiskSet::set`] or
/// [`ConditionRiskSet::update_each`], both of which clamp. A `ConditionRiskSet`
/// therefore holds values in `[0, 100]` at every point of its life.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConditionRiskSet {
    values: [f64; Condition::COUNT],
}

impl ConditionRiskSet {
    /// A set with every condition at zero risk.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Builds a set from percentages in canonical order, clamping each one.
    pub fn from_percentages(values: [f64; Condition::COUNT]) -> Self {
        Self {
            values: values.map(clamp_percentage),
        }
    }

    #[inline]
    pub fn get(&self, condition: Condition) -> f64 {
        self.values[condition.index()]
    }

    /// Stores a clamped percentage for `condition`.
    #[inline]
    pub fn set(&mut self, condition: Condition, value: f64) {
        self.values[condition.index()] = clamp_percentage(value);
    }

    /// Rewrites every entry through `f`, clamping each result.
    pub fn update_each<F>(&mut self, mut f: F)
    where
        F: FnMut(Condition, f64) -> f64,
    {
        for condition in Condition::ALL {
            let current = self.get(condition);
            self.set(condition, f(condition, current));
        }
    }

    /// Iterates `(condition, percentage)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Condition, f64)> + '_ {
        Condition::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    /// The raw percentages in canonical order.
    pub fn as_array(&self) -> [f64; Condition::COUNT] {
        self.values
    }
}

impl Serialize for ConditionRiskSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Condition::COUNT))?;
        for (condition, value) in self.iter() {
            map.serialize_entry(condition.name(), &value)?;
        }
        map.end()
    }
}

// ========================================================================================
//                                   DIAGNOSTICS
// ========================================================================================

/// The kind of non-finite value found in a classifier probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    NotANumber,
    PositiveInfinity,
    NegativeInfinity,
}

impl AnomalyKind {
    /// Classifies `value`, returning `None` for finite numbers.
    pub fn of(value: f64) -> Option<Self> {
        if value.is_nan() {
            Some(AnomalyKind::NotANumber)
        } else if value == f64::INFINITY {
            Some(AnomalyKind::PositiveInfinity)
        } else if value == f64::NEG_INFINITY {
            Some(AnomalyKind::NegativeInfinity)
        } else {
            None
        }
    }
}

/// A recoverable anomaly observed during one scoring pass.
///
/// Diagnostics travel with the report so that a substituted value can never be
/// mistaken for a genuine prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A NaN or infinite probability was replaced by zero risk.
    NumericAnomaly {
        condition: Condition,
        anomaly: AnomalyKind,
    },
    /// A finite probability outside `[0, 1]` was clamped.
    ProbabilityOutOfRange { condition: Condition, value: f64 },
    /// The classifier emitted more condition outputs than the engine knows about.
    SurplusOutputs { ignored: usize },
    /// The classifier output could not be interpreted; risks are unknown.
    ShapeMismatch { reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NumericAnomaly { condition, anomaly } => write!(
                f,
                "non-finite probability ({anomaly:?}) for {condition} replaced by zero risk"
            ),
            Diagnostic::ProbabilityOutOfRange { condition, value } => write!(
                f,
                "probability {value} for {condition} lies outside [0, 1] and was clamped"
            ),
            Diagnostic::SurplusOutputs { ignored } => write!(
                f,
                "classifier emitted {ignored} output(s) beyond the known conditions; they were ignored"
            ),
            Diagnostic::ShapeMismatch { reason } => {
                write!(f, "classifier output not recognized, risks unknown: {reason}")
            }
        }
    }
}
