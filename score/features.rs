//! # Feature Derivation
//!
//! Turns a [`RawUserInput`] into the secondary features the heuristics need
//! (BMI, blood-pressure difference and ratio, lifestyle score) and into the fixed
//! numeric row a classifier artifact was trained on.
//!
//! ## Encoding convention
//!
//! One polarity is used everywhere in this crate:
//! - `lifestyle_score`: smoking `+1`, drinking `+1`, exercising `-1`.
//! - Model row: gender male `1` / female `0`; every lifestyle flag yes `10` / no `0`.
//!
//! Nothing downstream is allowed to reinterpret these signs.

use crate::input::{Gender, RawUserInput};
use ndarray::Array2;
use serde::Serialize;

/// Column names of the model feature row, in order.
///
/// A classifier artifact declares the names it was trained with; the pipeline
/// refuses to score when the two lists differ.
pub const FEATURE_NAMES: [&str; 12] = [
    "gender",
    "age",
    "height",
    "weight",
    "smoke",
    "alcohol",
    "active",
    "systolic_bp",
    "diastolic_bp",
    "bp_ratio",
    "bmi",
    "bp_diff",
];

/// Value a lifestyle flag takes in the model row when set.
pub const FLAG_SCALE: f64 = 10.0;

/// Secondary features computed from one input record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedFeatures {
    /// Body mass index, rounded to two decimals. Zero when height is not positive.
    pub bmi: f64,
    /// `systolic - diastolic`; may be negative.
    pub blood_pressure_diff: f64,
    /// `systolic / diastolic`, or zero when diastolic is not positive.
    pub blood_pressure_ratio: f64,
    /// Signed lifestyle summary in `[-1, 2]`.
    pub lifestyle_score: i32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Body mass index from weight (kg) and height (cm), rounded to two decimals.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if height_cm <= 0.0 {
        return 0.0;
    }
    let height_m = height_cm / 100.0;
    round2(weight_kg / (height_m * height_m))
}

pub fn blood_pressure_diff(systolic: f64, diastolic: f64) -> f64 {
    systolic - diastolic
}

pub fn blood_pressure_ratio(systolic: f64, diastolic: f64) -> f64 {
    if diastolic > 0.0 {
        systolic / diastolic
    } else {
        0.0
    }
}

pub fn lifestyle_score(smokes: bool, drinks: bool, exercises: bool) -> i32 {
    i32::from(smokes) + i32::from(drinks) - i32::from(exercises)
}

fn flag(value: bool) -> f64 {
    if value { FLAG_SCALE } else { 0.0 }
}

impl DerivedFeatures {
    pub fn derive(input: &RawUserInput) -> Self {
        Self {
            bmi: bmi(input.weight, input.height),
            blood_pressure_diff: blood_pressure_diff(input.systolic_bp, input.diastolic_bp),
            blood_pressure_ratio: blood_pressure_ratio(input.systolic_bp, input.diastolic_bp),
            lifestyle_score: lifestyle_score(input.smokes, input.drinks, input.exercises),
        }
    }
}

/// Builds the single-sample `[1, FEATURE_NAMES.len()]` model row.
pub fn encode_row(input: &RawUserInput, derived: &DerivedFeatures) -> Array2<f64> {
    let gender = match input.gender {
        Gender::Male => 1.0,
        Gender::Female => 0.0,
    };
    let row = [
        gender,
        f64::from(input.age),
        input.height,
        input.weight,
        flag(input.smokes),
        flag(input.drinks),
        flag(input.exercises),
        input.systolic_bp,
        input.diastolic_bp,
        round2(derived.blood_pressure_ratio),
        derived.bmi,
        derived.blood_pressure_diff,
    ];
    Array2::from_shape_fn((1, row.len()), |(_, j)| row[j])
}
