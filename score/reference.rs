//! Population reference values for comparing one user against the adult average.
//!
//! The figures are Korean adult averages by gender. They feed a comparison table
//! that a presenter can chart next to the user's own numbers.

use crate::features::DerivedFeatures;
use crate::input::{Gender, RawUserInput};
use crate::types::{Condition, ConditionRiskSet};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationAverages {
    pub age: f64,
    pub height: f64,
    pub weight: f64,
    pub bmi: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub hypertension_risk: f64,
    pub diabetes_risk: f64,
    pub hyperlipidemia_risk: f64,
}

const MALE_AVERAGES: PopulationAverages = PopulationAverages {
    age: 45.0,
    height: 172.0,
    weight: 74.0,
    bmi: 24.8,
    systolic_bp: 120.0,
    diastolic_bp: 78.0,
    hypertension_risk: 30.0,
    diabetes_risk: 15.0,
    hyperlipidemia_risk: 25.0,
};

const FEMALE_AVERAGES: PopulationAverages = PopulationAverages {
    age: 45.0,
    height: 160.0,
    weight: 62.0,
    bmi: 24.2,
    systolic_bp: 115.0,
    diastolic_bp: 75.0,
    hypertension_risk: 28.0,
    diabetes_risk: 12.0,
    hyperlipidemia_risk: 20.0,
};

impl PopulationAverages {
    pub fn for_gender(gender: Gender) -> &'static PopulationAverages {
        match gender {
            Gender::Male => &MALE_AVERAGES,
            Gender::Female => &FEMALE_AVERAGES,
        }
    }
}

/// One metric of the user-versus-average comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: &'static str,
    pub user: f64,
    pub average: f64,
}

/// User-versus-average rows for the gender of `input`.
///
/// Age and height are left out; they describe the user rather than their health.
/// The reference table carries no obesity risk, so obesity is compared through BMI.
pub fn compare(
    input: &RawUserInput,
    derived: &DerivedFeatures,
    risks: &ConditionRiskSet,
) -> Vec<ComparisonRow> {
    let averages = PopulationAverages::for_gender(input.gender);
    let row = |metric, user, average| ComparisonRow {
        metric,
        user,
        average,
    };
    vec![
        row("weight", input.weight, averages.weight),
        row("bmi", derived.bmi, averages.bmi),
        row("systolic_bp", input.systolic_bp, averages.systolic_bp),
        row("diastolic_bp", input.diastolic_bp, averages.diastolic_bp),
        row(
            "hypertension_risk",
            risks.get(Condition::Hypertension),
            averages.hypertension_risk,
        ),
        row(
            "diabetes_risk",
            risks.get(Condition::Diabetes),
            averages.diabetes_risk,
        ),
        row(
            "hyperlipidemia_risk",
            risks.get(Condition::Hyperlipidemia),
            averages.hyperlipidemia_risk,
        ),
    ]
}
