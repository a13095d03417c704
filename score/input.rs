//! # Raw User Input and Boundary Validation
//!
//! This module owns the nine raw fields captured by one form submission and the
//! range checks that guard the scoring core. Validation is strict: values outside
//! their declared range are rejected, never clipped. A UI may clip through widget
//! bounds, but the core is callable from a CLI or a batch file and must not trust
//! its caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Biological sex as recorded by the input form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

// --- Declared field ranges (inclusive) ---

pub const AGE_RANGE: RangeInclusive<u32> = 10..=100;
pub const HEIGHT_CM_RANGE: RangeInclusive<f64> = 120.0..=250.0;
pub const WEIGHT_KG_RANGE: RangeInclusive<f64> = 30.0..=200.0;
pub const SYSTOLIC_RANGE: RangeInclusive<f64> = 50.0..=200.0;
pub const DIASTOLIC_RANGE: RangeInclusive<f64> = 40.0..=150.0;

/// One user's metrics from a single form submission.
///
/// The scoring pipeline only ever borrows a `RawUserInput` immutably; a value is
/// created per submission and dropped after its scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUserInput {
    pub gender: Gender,
    /// Age in whole years.
    pub age: u32,
    /// Height in centimetres.
    pub height: f64,
    /// Weight in kilograms.
    pub weight: f64,
    /// Systolic blood pressure in mmHg.
    pub systolic_bp: f64,
    /// Diastolic blood pressure in mmHg.
    pub diastolic_bp: f64,
    #[serde(default)]
    pub smokes: bool,
    #[serde(default)]
    pub drinks: bool,
    #[serde(default)]
    pub exercises: bool,
}

/// A single field that failed its range check.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeViolation {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} is outside [{}, {}]",
            self.field, self.value, self.min, self.max
        )
    }
}

/// Every violated field of one input record.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} field(s) out of range: {}", .violations.len(), describe(.violations))]
pub struct InputError {
    pub violations: Vec<RangeViolation>,
}

fn describe(violations: &[RangeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_f64(
    violations: &mut Vec<RangeViolation>,
    field: &'static str,
    value: f64,
    range: RangeInclusive<f64>,
) {
    // NaN fails `contains`, so non-finite input is reported like any other violation.
    if !range.contains(&value) {
        violations.push(RangeViolation {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
}

impl RawUserInput {
    /// Checks every field against its declared range.
    ///
    /// # Errors
    /// Returns an [`InputError`] listing all violated fields, not just the first.
    pub fn validate(&self) -> Result<(), InputError> {
        let mut violations = Vec::new();

        if !AGE_RANGE.contains(&self.age) {
            violations.push(RangeViolation {
                field: "age",
                value: f64::from(self.age),
                min: f64::from(*AGE_RANGE.start()),
                max: f64::from(*AGE_RANGE.end()),
            });
        }
        check_f64(&mut violations, "height", self.height, HEIGHT_CM_RANGE);
        check_f64(&mut violations, "weight", self.weight, WEIGHT_KG_RANGE);
        check_f64(&mut violations, "systolic_bp", self.systolic_bp, SYSTOLIC_RANGE);
        check_f64(&mut violations, "diastolic_bp", self.diastolic_bp, DIASTOLIC_RANGE);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(InputError { violations })
        }
    }
}
