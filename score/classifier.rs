//! The boundary to an externally trained multi-output classifier.
//!
//! The engine never knows how a classifier was built. It hands over one encoded
//! feature row and receives a probability payload whose shape depends on the
//! classifier's implementation; [`crate::normalize`] is responsible for making
//! sense of it.

use crate::model::ModelError;
use ndarray::{Array2, ArrayD, ArrayView2};

/// The raw probability payload returned by [`Classifier::predict_proba`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutput {
    /// One `(n_samples, n_classes)` array per condition, as a multi-estimator
    /// wrapper returns them.
    PerCondition(Vec<Array2<f64>>),
    /// A single array of arbitrary rank. Ranks 1, 2 and 3 are understood:
    /// `(n_conditions,)` positive probabilities, `(n_conditions, n_classes)` for one
    /// sample, or `(n_conditions, n_samples, n_classes)`.
    Dense(ArrayD<f64>),
}

/// A pretrained probabilistic classifier with one binary output per condition.
pub trait Classifier {
    /// Feature column names the classifier was trained on, in order.
    fn feature_names(&self) -> &[String];

    /// Class labels per condition output, when the classifier exposes them.
    ///
    /// When `None`, the positive class is assumed to sit at index 1.
    fn class_labels(&self) -> Option<Vec<Vec<i64>>> {
        None
    }

    /// Class-membership probabilities for every row of `features`.
    ///
    /// # Errors
    /// Implementations return a [`ModelError`] when they cannot evaluate the rows.
    fn predict_proba(&self, features: ArrayView2<f64>) -> Result<ClassifierOutput, ModelError>;
}
