use crate::classifier::{Classifier, ClassifierOutput};
use crate::types::Condition;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the public, human-readable format of a classifier artifact
// when serialized to a TOML file.

/// The artifact format this build reads and writes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Selects the payload shape [`LogisticArtifact::predict_proba`] emits.
///
/// Different exporters hand back differently shaped arrays for the same model. An
/// artifact records which one it mimics so that every shape the adapter understands
/// can be produced from a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// A list of `(n_samples, 2)` arrays, one per condition.
    PerCondition,
    /// One `(n_conditions, n_samples, 2)` array.
    Stacked,
    /// One `(n_conditions, 2)` array; only valid for a single sample.
    SingleSample,
    /// One `(n_conditions,)` vector of positive-class probabilities; single sample only.
    PositiveVector,
}

/// One binary logistic output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionHead {
    pub condition: Condition,
    pub intercept: f64,
    /// One weight per entry of [`LogisticArtifact::feature_names`].
    pub coefficients: Vec<f64>,
    /// Class label of each probability column. The label `1` marks the positive class.
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

fn default_classes() -> [i64; 2] {
    [0, 1]
}

/// The top-level, self-contained classifier artifact.
/// This is the structure that gets saved to and loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticArtifact {
    pub format_version: u32,
    pub output_layout: OutputLayout,
    /// Canonical feature order the coefficients were fitted against.
    pub feature_names: Vec<String>,
    /// One head per condition, in canonical condition order.
    pub heads: Vec<ConditionHead>,
}

/// Custom error type for artifact loading, saving, and prediction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write classifier artifact: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML classifier artifact: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize classifier artifact to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Malformed classifier artifact: {0}")]
    Malformed(String),
    #[error("Prediction data has {found} feature columns, but the classifier was trained on {expected}.")]
    FeatureCountMismatch { found: usize, expected: usize },
    #[error("Output layout {layout:?} supports exactly one sample per call, got {samples}.")]
    LayoutRequiresSingleSample { layout: OutputLayout, samples: usize },
}

impl LogisticArtifact {
    /// Checks the structural invariants a loaded artifact must satisfy.
    ///
    /// # Errors
    /// Returns [`ModelError::Malformed`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::Malformed(format!(
                "format_version {} is not supported (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.heads.len() != Condition::COUNT {
            return Err(ModelError::Malformed(format!(
                "artifact has {} condition heads, expected exactly {}",
                self.heads.len(),
                Condition::COUNT
            )));
        }
        for (position, (head, expected)) in self.heads.iter().zip(Condition::ALL).enumerate() {
            if head.condition != expected {
                return Err(ModelError::Malformed(format!(
                    "head {position} is '{}', but canonical order expects '{expected}' there",
                    head.condition
                )));
            }
            if head.coefficients.len() != self.feature_names.len() {
                return Err(ModelError::Malformed(format!(
                    "head '{}' has {} coefficients for {} features",
                    head.condition,
                    head.coefficients.len(),
                    self.feature_names.len()
                )));
            }
            if !head.classes.contains(&1) {
                return Err(ModelError::Malformed(format!(
                    "head '{}' declares classes {:?} without the positive label 1",
                    head.condition, head.classes
                )));
            }
        }
        Ok(())
    }

    /// Saves the artifact to a file in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads and validates an artifact from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let artifact: Self = toml::from_str(&toml_string)?;
        artifact.validate()?;
        log::info!(
            "Loaded classifier artifact {} ({} heads, {} features, layout {:?})",
            path.display(),
            artifact.heads.len(),
            artifact.feature_names.len(),
            artifact.output_layout
        );
        Ok(artifact)
    }
}

impl Classifier for LogisticArtifact {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn class_labels(&self) -> Option<Vec<Vec<i64>>> {
        Some(self.heads.iter().map(|h| h.classes.to_vec()).collect())
    }

    fn predict_proba(&self, features: ArrayView2<f64>) -> Result<ClassifierOutput, ModelError> {
        if features.ncols() != self.feature_names.len() {
            return Err(ModelError::FeatureCountMismatch {
                found: features.ncols(),
                expected: self.feature_names.len(),
            });
        }
        let samples = features.nrows();
        let single_sample_only = matches!(
            self.output_layout,
            OutputLayout::SingleSample | OutputLayout::PositiveVector
        );
        if single_sample_only && samples != 1 {
            return Err(ModelError::LayoutRequiresSingleSample {
                layout: self.output_layout,
                samples,
            });
        }

        let per_head: Vec<Array2<f64>> = self
            .heads
            .iter()
            .map(|head| internal::head_probabilities(head, features))
            .collect();

        let output = match self.output_layout {
            OutputLayout::PerCondition => ClassifierOutput::PerCondition(per_head),
            OutputLayout::Stacked => {
                let stacked = Array3::from_shape_fn((per_head.len(), samples, 2), |(c, s, k)| {
                    per_head[c][[s, k]]
                });
                ClassifierOutput::Dense(stacked.into_dyn())
            }
            OutputLayout::SingleSample => {
                let flat = Array2::from_shape_fn((per_head.len(), 2), |(c, k)| per_head[c][[0, k]]);
                ClassifierOutput::Dense(flat.into_dyn())
            }
            OutputLayout::PositiveVector => {
                let positives: Array1<f64> = self
                    .heads
                    .iter()
                    .zip(&per_head)
                    .map(|(head, probs)| probs[[0, internal::positive_column(head)]])
                    .collect();
                ClassifierOutput::Dense(positives.into_dyn())
            }
        };
        Ok(output)
    }
}

/// Internal module for prediction-specific implementation details.
mod internal {
    use super::*;

    pub(super) fn positive_column(head: &ConditionHead) -> usize {
        if head.classes[0] == 1 { 0 } else { 1 }
    }

    /// `(n_samples, 2)` class probabilities of one head, columns ordered by `head.classes`.
    pub(super) fn head_probabilities(head: &ConditionHead, features: ArrayView2<f64>) -> Array2<f64> {
        let weights = ArrayView1::from(head.coefficients.as_slice());
        let eta = features.dot(&weights) + head.intercept;
        // Clamp eta to prevent numerical overflow in exp().
        let positive = eta.mapv(|e| 1.0 / (1.0 + f64::exp(-e.clamp(-700.0, 700.0))));

        let positive_col = positive_column(head);
        let mut probs = Array2::zeros((features.nrows(), 2));
        for (mut row, p) in probs.axis_iter_mut(Axis(0)).zip(positive.iter()) {
            row[positive_col] = *p;
            row[1 - positive_col] = 1.0 - *p;
        }
        probs
    }
}

// --- Process-wide artifact cache ---

static ARTIFACT_CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<LogisticArtifact>>>> = OnceLock::new();

/// Loads an artifact at most once per process and hands out shared read-only handles.
///
/// Paths are canonicalized, so two spellings of the same file share one entry.
pub fn load_shared(path: &Path) -> Result<Arc<LogisticArtifact>, ModelError> {
    let key = fs::canonicalize(path)?;
    let cache = ARTIFACT_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    // Entries are inserted whole, so a poisoned lock still guards a consistent map.
    let mut entries = cache.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(found) = entries.get(&key) {
        log::debug!("Reusing cached classifier artifact {}", key.display());
        return Ok(Arc::clone(found));
    }
    let artifact = Arc::new(LogisticArtifact::load(&key)?);
    entries.insert(key, Arc::clone(&artifact));
    Ok(artifact)
}
