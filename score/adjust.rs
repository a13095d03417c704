//! # Heuristic Adjustment Chain
//!
//! Post-hoc corrections applied on top of the classifier's percentages, in a fixed
//! order:
//!
//! 1. obesity override from a piecewise-linear BMI curve,
//! 2. lifestyle deltas (smoking, drinking, exercise) on every other condition,
//! 3. a linear age shift,
//! 4. a final clamp to `[0, 100]`.
//!
//! Each step is a free function over a [`ConditionRiskSet`], so every one of them can
//! be exercised on its own. All steps are pure and deterministic. Because the set
//! clamps on every write, the `[0, 100]` invariant also holds between steps.
//!
//! Every constant lives in [`AdjustmentConfig`]; nothing here is tuned inline.

use crate::features::DerivedFeatures;
use crate::input::RawUserInput;
use crate::types::{Condition, ConditionRiskSet};
use serde::{Deserialize, Serialize};

// ========================================================================================
//                                    CONFIGURATION
// ========================================================================================

/// How the BMI curve combines with the classifier's own obesity prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObesityMode {
    /// Keep the larger of the model prediction and the curve.
    #[default]
    Max,
    /// Discard the model prediction and use the curve.
    Replace,
}

/// Piecewise-linear obesity risk as a function of BMI.
///
/// Flat at `floor_risk` up to `floor_bmi`, linear to `knee_risk` at `knee_bmi`,
/// linear to `ceiling_risk` at `ceiling_bmi`, flat beyond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObesityCurve {
    pub floor_bmi: f64,
    pub floor_risk: f64,
    pub knee_bmi: f64,
    pub knee_risk: f64,
    pub ceiling_bmi: f64,
    pub ceiling_risk: f64,
    pub mode: ObesityMode,
}

impl Default for ObesityCurve {
    fn default() -> Self {
        Self {
            floor_bmi: 16.0,
            floor_risk: 5.0,
            knee_bmi: 25.0,
            knee_risk: 50.0,
            ceiling_bmi: 40.0,
            ceiling_risk: 100.0,
            mode: ObesityMode::Max,
        }
    }
}

fn lerp(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

impl ObesityCurve {
    /// Obesity risk percentage at `bmi`.
    pub fn risk_at(&self, bmi: f64) -> f64 {
        if bmi <= self.floor_bmi {
            self.floor_risk
        } else if bmi <= self.knee_bmi {
            lerp(bmi, self.floor_bmi, self.floor_risk, self.knee_bmi, self.knee_risk)
        } else if bmi <= self.ceiling_bmi {
            lerp(bmi, self.knee_bmi, self.knee_risk, self.ceiling_bmi, self.ceiling_risk)
        } else {
            self.ceiling_risk
        }
    }

    /// The curve is only meaningful with strictly increasing breakpoints and
    /// non-decreasing risks; returns a description of the first problem.
    pub fn check(&self) -> Result<(), String> {
        if !(self.floor_bmi < self.knee_bmi && self.knee_bmi < self.ceiling_bmi) {
            return Err(format!(
                "obesity curve breakpoints must increase strictly (got {}, {}, {})",
                self.floor_bmi, self.knee_bmi, self.ceiling_bmi
            ));
        }
        if !(self.floor_risk <= self.knee_risk && self.knee_risk <= self.ceiling_risk) {
            return Err(format!(
                "obesity curve risks must not decrease (got {}, {}, {})",
                self.floor_risk, self.knee_risk, self.ceiling_risk
            ));
        }
        Ok(())
    }
}

/// Percentage-point deltas for lifestyle flags. All magnitudes are non-negative;
/// the sign of each delta is fixed by [`LifestyleFactor::delta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifestyleDeltas {
    /// Added when the user smokes.
    pub smoking: f64,
    /// Added when the user drinks.
    pub drinking: f64,
    /// Subtracted when the user exercises.
    pub exercise: f64,
}

impl Default for LifestyleDeltas {
    fn default() -> Self {
        Self {
            smoking: 10.0,
            drinking: 5.0,
            exercise: 2.0,
        }
    }
}

/// Linear age shift parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgeAdjustment {
    /// Age at which the shift is zero.
    pub baseline_age: f64,
    /// Ages above the cap are treated as the cap.
    pub age_cap: f64,
    /// Percentage points per year of `min(age, age_cap) - baseline_age`.
    pub points_per_year: f64,
    /// Multiplier applied to the hypertension shift.
    pub hypertension_factor: f64,
}

impl Default for AgeAdjustment {
    fn default() -> Self {
        Self {
            baseline_age: 50.0,
            age_cap: 70.0,
            points_per_year: 0.5,
            hypertension_factor: 0.5,
        }
    }
}

/// Every tunable constant of the adjustment chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjustmentConfig {
    pub obesity: ObesityCurve,
    pub lifestyle: LifestyleDeltas,
    pub age: AgeAdjustment,
}

// ========================================================================================
//                                    THE STEPS
// ========================================================================================

/// Step 1: recompute obesity risk from BMI.
pub fn apply_obesity_override(risks: &mut ConditionRiskSet, bmi: f64, curve: &ObesityCurve) {
    let from_curve = curve.risk_at(bmi);
    let combined = match curve.mode {
        ObesityMode::Max => risks.get(Condition::Obesity).max(from_curve),
        ObesityMode::Replace => from_curve,
    };
    risks.set(Condition::Obesity, combined);
}

/// A lifestyle flag that moves non-obesity risks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifestyleFactor {
    Smoking,
    Drinking,
    Exercise,
}

impl LifestyleFactor {
    /// The factors set on `input`.
    pub fn present(input: &RawUserInput) -> Vec<LifestyleFactor> {
        [
            (input.smokes, LifestyleFactor::Smoking),
            (input.drinks, LifestyleFactor::Drinking),
            (input.exercises, LifestyleFactor::Exercise),
        ]
        .into_iter()
        .filter_map(|(set, factor)| set.then_some(factor))
        .collect()
    }

    /// Signed percentage-point delta of this factor.
    pub fn delta(self, deltas: &LifestyleDeltas) -> f64 {
        match self {
            LifestyleFactor::Smoking => deltas.smoking,
            LifestyleFactor::Drinking => deltas.drinking,
            LifestyleFactor::Exercise => -deltas.exercise,
        }
    }
}

/// Step 2: shift every non-obesity condition by the summed lifestyle delta.
///
/// Deltas are summed before the single clamp, so the order of `factors` is irrelevant.
pub fn apply_lifestyle(
    risks: &mut ConditionRiskSet,
    factors: &[LifestyleFactor],
    deltas: &LifestyleDeltas,
) {
    let total: f64 = factors.iter().map(|f| f.delta(deltas)).sum();
    if total == 0.0 {
        return;
    }
    risks.update_each(|condition, value| match condition {
        Condition::Obesity => value,
        _ => value + total,
    });
}

/// Percentage-point shift the age step applies to `condition`.
pub fn age_shift(condition: Condition, age: u32, params: &AgeAdjustment) -> f64 {
    let effective_age = f64::from(age).min(params.age_cap);
    let shift = params.points_per_year * (effective_age - params.baseline_age);
    match condition {
        Condition::Hypertension => shift * params.hypertension_factor,
        _ => shift,
    }
}

/// Step 3: shift every condition linearly with capped age.
pub fn apply_age(risks: &mut ConditionRiskSet, age: u32, params: &AgeAdjustment) {
    risks.update_each(|condition, value| value + age_shift(condition, age, params));
}

/// Step 4: final clamp of every value to `[0, 100]`.
pub fn clamp_all(risks: &mut ConditionRiskSet) {
    risks.update_each(|_, value| value);
}

impl AdjustmentConfig {
    /// Runs the whole chain in order.
    pub fn apply(&self, risks: &mut ConditionRiskSet, input: &RawUserInput, derived: &DerivedFeatures) {
        apply_obesity_override(risks, derived.bmi, &self.obesity);
        log::debug!("after obesity override: {:?}", risks.as_array());

        apply_lifestyle(risks, &LifestyleFactor::present(input), &self.lifestyle);
        log::debug!("after lifestyle deltas: {:?}", risks.as_array());

        apply_age(risks, input.age, &self.age);
        log::debug!("after age shift: {:?}", risks.as_array());

        clamp_all(risks);
    }
}
