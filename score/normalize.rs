// ========================================================================================
//
//                         CLASSIFIER OUTPUT SHAPE NORMALIZATION
//
// ========================================================================================
//
// A multi-output classifier does not agree with itself about the shape of its answer.
// Depending on the wrapper that produced it, the same prediction for one sample can
// arrive as:
//
//   (a) a list of `(n_samples, n_classes)` arrays, one per condition;
//   (b) one `(n_conditions, n_samples, n_classes)` array;
//   (c) one `(n_conditions, n_classes)` array;
//   (d) one `(n_conditions,)` vector of positive-class probabilities.
//
// This module reduces every recognized payload to one positive-class percentage per
// condition. Anything else is a `ShapeError`; the caller decides whether to substitute
// unknown markers, but this module never guesses.

use crate::classifier::ClassifierOutput;
use crate::types::{AnomalyKind, Condition, ConditionRiskSet, Diagnostic};
use ndarray::{ArrayView1, ArrayView2, Axis, Ix1, Ix2, Ix3};
use thiserror::Error;

/// The class label that means "condition present".
pub const POSITIVE_LABEL: i64 = 1;

/// Column of the positive class when the classifier exposes no labels.
pub const DEFAULT_POSITIVE_INDEX: usize = 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("classifier output has rank {0}; only ranks 1, 2 and 3 are understood")]
    UnsupportedRank(usize),
    #[error("classifier output covers {found} condition(s), but {expected} are required")]
    TooFewConditions { found: usize, expected: usize },
    #[error("classifier output holds {found} sample(s) for a single-sample scoring pass")]
    SampleCount { found: usize },
    #[error(
        "output for {condition} has {columns} class column(s), so positive column {index} does not exist"
    )]
    MissingPositiveColumn {
        condition: Condition,
        index: usize,
        columns: usize,
    },
    #[error(
        "class labels {labels:?} for {condition} do not include the positive label {positive}",
        positive = POSITIVE_LABEL
    )]
    MissingPositiveLabel { condition: Condition, labels: Vec<i64> },
    #[error("classifier lists class labels for {provided} output(s), none for {condition}")]
    MissingClassLabels { condition: Condition, provided: usize },
}

/// Per-condition percentages plus every anomaly met while producing them.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOutput {
    pub risks: ConditionRiskSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// The payload reduced to one entry per condition output, still in classifier order.
enum Entries<'a> {
    /// Full class-probability rows.
    ClassRows(Vec<ArrayView1<'a, f64>>),
    /// Positive-class probabilities only.
    Positives(ArrayView1<'a, f64>),
}

impl Entries<'_> {
    fn len(&self) -> usize {
        match self {
            Entries::ClassRows(rows) => rows.len(),
            Entries::Positives(values) => values.len(),
        }
    }
}

/// Reduces one condition's `(n_samples, n_classes)` block to its only sample row.
fn single_sample_row(block: ArrayView2<'_, f64>) -> Result<ArrayView1<'_, f64>, ShapeError> {
    if block.nrows() != 1 {
        return Err(ShapeError::SampleCount {
            found: block.nrows(),
        });
    }
    Ok(block.index_axis_move(Axis(0), 0))
}

fn entries(output: &ClassifierOutput) -> Result<Entries<'_>, ShapeError> {
    match output {
        ClassifierOutput::PerCondition(blocks) => blocks
            .iter()
            .map(|block| single_sample_row(block.view()))
            .collect::<Result<Vec<_>, _>>()
            .map(Entries::ClassRows),
        ClassifierOutput::Dense(array) => {
            let rank = array.ndim();
            let wrong_rank = |_| ShapeError::UnsupportedRank(rank);
            match rank {
                1 => Ok(Entries::Positives(
                    array.view().into_dimensionality::<Ix1>().map_err(wrong_rank)?,
                )),
                2 => {
                    let matrix = array.view().into_dimensionality::<Ix2>().map_err(wrong_rank)?;
                    let rows = (0..matrix.nrows())
                        .map(|i| matrix.clone().index_axis_move(Axis(0), i))
                        .collect();
                    Ok(Entries::ClassRows(rows))
                }
                3 => {
                    let cube = array.view().into_dimensionality::<Ix3>().map_err(wrong_rank)?;
                    (0..cube.len_of(Axis(0)))
                        .map(|c| single_sample_row(cube.clone().index_axis_move(Axis(0), c)))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Entries::ClassRows)
                }
                other => Err(ShapeError::UnsupportedRank(other)),
            }
        }
    }
}

fn positive_index(
    condition: Condition,
    class_labels: Option<&[Vec<i64>]>,
) -> Result<usize, ShapeError> {
    let Some(all_labels) = class_labels else {
        return Ok(DEFAULT_POSITIVE_INDEX);
    };
    // Once a classifier exposes labels, every condition output must be labelled.
    let labels = all_labels
        .get(condition.index())
        .ok_or(ShapeError::MissingClassLabels {
            condition,
            provided: all_labels.len(),
        })?;
    labels
        .iter()
        .position(|&label| label == POSITIVE_LABEL)
        .ok_or_else(|| ShapeError::MissingPositiveLabel {
            condition,
            labels: labels.clone(),
        })
}

fn flag(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}

/// Converts one probability to a percentage, zeroing non-finite values and clamping
/// out-of-range ones. Every substitution is recorded.
fn to_percentage(condition: Condition, probability: f64, diagnostics: &mut Vec<Diagnostic>) -> f64 {
    if let Some(anomaly) = AnomalyKind::of(probability) {
        flag(diagnostics, Diagnostic::NumericAnomaly { condition, anomaly });
        return 0.0;
    }
    if !(0.0..=1.0).contains(&probability) {
        flag(
            diagnostics,
            Diagnostic::ProbabilityOutOfRange {
                condition,
                value: probability,
            },
        );
    }
    probability.clamp(0.0, 1.0) * 100.0
}

/// Flattens a classifier payload into one positive-class percentage per condition.
///
/// `class_labels`, when present, holds the label of every probability column per
/// condition output; the positive column is the one labelled [`POSITIVE_LABEL`].
///
/// # Errors
/// Returns a [`ShapeError`] for unsupported ranks, fewer outputs than known
/// conditions, more than one sample, or a missing positive class.
pub fn normalize(
    output: &ClassifierOutput,
    class_labels: Option<&[Vec<i64>]>,
) -> Result<NormalizedOutput, ShapeError> {
    let entries = entries(output)?;
    if entries.len() < Condition::COUNT {
        return Err(ShapeError::TooFewConditions {
            found: entries.len(),
            expected: Condition::COUNT,
        });
    }

    let mut diagnostics = Vec::new();
    if entries.len() > Condition::COUNT {
        flag(
            &mut diagnostics,
            Diagnostic::SurplusOutputs {
                ignored: entries.len() - Condition::COUNT,
            },
        );
    }

    let mut risks = ConditionRiskSet::zeroed();
    for condition in Condition::ALL {
        let probability = match &entries {
            Entries::Positives(values) => values[condition.index()],
            Entries::ClassRows(rows) => {
                let row = &rows[condition.index()];
                let index = positive_index(condition, class_labels)?;
                *row.get(index).ok_or(ShapeError::MissingPositiveColumn {
                    condition,
                    index,
                    columns: row.len(),
                })?
            }
        };
        risks.set(condition, to_percentage(condition, probability, &mut diagnostics));
    }

    Ok(NormalizedOutput { risks, diagnostics })
}
