// ========================================================================================
//
//                             THE RISK SCORING PIPELINE
//
// ========================================================================================
//
// One scoring pass, in dependency order:
//
//   validate -> derive features -> encode row -> check feature contract
//            -> classifier -> normalize output -> adjustment chain -> tiers
//
// The classifier is injected at construction and shared read-only behind an `Arc`, so
// one loaded artifact serves every pass of the process and tests can hand in stubs.

use crate::classifier::Classifier;
use crate::config::ScoringConfig;
use crate::features::{self, DerivedFeatures, FEATURE_NAMES};
use crate::input::{InputError, RawUserInput};
use crate::model::{self, LogisticArtifact, ModelError};
use crate::normalize::{self, ShapeError};
use crate::reference::{self, ComparisonRow};
use crate::tier::TierSet;
use crate::types::{ConditionRiskSet, Diagnostic};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Everything that can stop a scoring pass.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("Classifier model at '{}' is unavailable: {source}", .path.display())]
    ModelUnavailable { path: PathBuf, source: ModelError },
    #[error(
        "Classifier expects features {expected:?}, but this engine encodes {provided:?}; the artifact was trained for a different feature contract"
    )]
    FeatureContract {
        expected: Vec<String>,
        provided: Vec<String>,
    },
    #[error("Classifier failed to evaluate the feature row: {0}")]
    Classifier(#[source] ModelError),
    #[error("Classifier output shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeError),
}

/// Whether the report carries real predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Scored,
    /// The classifier output was unreadable; `risks` are placeholders.
    Unknown,
}

/// The result of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub status: ScoreStatus,
    pub risks: ConditionRiskSet,
    pub tiers: TierSet,
    pub features: DerivedFeatures,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Vec<ComparisonRow>>,
}

impl RiskReport {
    /// Attaches the user-versus-population comparison table.
    pub fn with_comparison(mut self, input: &RawUserInput) -> Self {
        self.comparison = Some(reference::compare(input, &self.features, &self.risks));
        self
    }
}

/// Scores user inputs against one injected classifier.
pub struct RiskScorer<C: Classifier> {
    classifier: Arc<C>,
    config: ScoringConfig,
}

impl<C: Classifier> RiskScorer<C> {
    pub fn new(classifier: Arc<C>, config: ScoringConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn check_feature_contract(&self) -> Result<(), ScoringError> {
        let expected = self.classifier.feature_names();
        let matches = expected.len() == FEATURE_NAMES.len()
            && expected.iter().zip(FEATURE_NAMES).all(|(a, b)| a == b);
        if matches {
            Ok(())
        } else {
            Err(ScoringError::FeatureContract {
                expected: expected.to_vec(),
                provided: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    /// Runs one full scoring pass.
    ///
    /// # Errors
    /// Any [`ScoringError`]; a classifier output of unrecognized shape is reported as
    /// [`ScoringError::ShapeMismatch`] rather than silently read as zero risk.
    pub fn score(&self, input: &RawUserInput) -> Result<RiskReport, ScoringError> {
        input.validate()?;
        self.check_feature_contract()?;

        let derived = DerivedFeatures::derive(input);
        log::debug!("derived features: {derived:?}");
        let row = features::encode_row(input, &derived);

        let output = self
            .classifier
            .predict_proba(row.view())
            .map_err(ScoringError::Classifier)?;
        let labels = self.classifier.class_labels();
        let normalized = normalize::normalize(&output, labels.as_deref())?;
        log::debug!("normalized classifier output: {:?}", normalized.risks.as_array());

        let mut risks = normalized.risks;
        self.config.adjustments.apply(&mut risks, input, &derived);
        let tiers = self.config.tiers.classify(&risks);

        Ok(RiskReport {
            status: ScoreStatus::Scored,
            risks,
            tiers,
            features: derived,
            diagnostics: normalized.diagnostics,
            comparison: None,
        })
    }

    /// Like [`RiskScorer::score`], but an unreadable classifier output yields an
    /// [`ScoreStatus::Unknown`] report instead of an error.
    ///
    /// The placeholder risks are zero, every tier is [`crate::tier::RiskTier::Unknown`]
    /// and the report carries a [`Diagnostic::ShapeMismatch`], so the substitution can
    /// never pass for a genuine low-risk prediction. All other errors still propagate.
    pub fn score_or_unknown(&self, input: &RawUserInput) -> Result<RiskReport, ScoringError> {
        match self.score(input) {
            Err(ScoringError::ShapeMismatch(err)) => {
                let diagnostic = Diagnostic::ShapeMismatch {
                    reason: err.to_string(),
                };
                log::warn!("{diagnostic}");
                Ok(RiskReport {
                    status: ScoreStatus::Unknown,
                    risks: ConditionRiskSet::zeroed(),
                    tiers: TierSet::unknown(),
                    features: DerivedFeatures::derive(input),
                    diagnostics: vec![diagnostic],
                    comparison: None,
                })
            }
            other => other,
        }
    }
}

/// Loads a classifier artifact through the process-wide cache, reporting failure
/// as [`ScoringError::ModelUnavailable`].
pub fn load_classifier(path: &Path) -> Result<Arc<LogisticArtifact>, ScoringError> {
    model::load_shared(path).map_err(|source| ScoringError::ModelUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierOutput;
    use crate::input::tests::reference_adult;
    use crate::model::OutputLayout;
    use crate::model::tests::intercept_only_artifact;
    use crate::tier::RiskTier;
    use crate::types::Condition;
    use approx::assert_abs_diff_eq;
    use ndarray::{ArrayD, ArrayView2, IxDyn};

    fn logit(p: f64) -> f64 {
        (p / (1.0 - p)).ln()
    }

    fn reference_scorer(layout: OutputLayout) -> RiskScorer<LogisticArtifact> {
        let intercepts = [logit(0.30), logit(0.20), logit(0.10), logit(0.25)];
        RiskScorer::new(
            Arc::new(intercept_only_artifact(layout, intercepts)),
            ScoringConfig::default(),
        )
    }

    struct FourDimensional {
        names: Vec<String>,
    }

    impl Classifier for FourDimensional {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict_proba(&self, _: ArrayView2<f64>) -> Result<ClassifierOutput, ModelError> {
            Ok(ClassifierOutput::Dense(ArrayD::zeros(IxDyn(&[4, 1, 1, 2]))))
        }
    }

    fn four_dimensional() -> RiskScorer<FourDimensional> {
        let names = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        RiskScorer::new(Arc::new(FourDimensional { names }), ScoringConfig::default())
    }

    #[test]
    fn reference_adult_regression() {
        let report = reference_scorer(OutputLayout::PerCondition)
            .score(&reference_adult())
            .expect("score");
        assert_eq!(report.status, ScoreStatus::Scored);
        assert_abs_diff_eq!(report.features.bmi, 24.22, epsilon = 1e-12);
        assert_abs_diff_eq!(report.risks.get(Condition::Hypertension), 27.5, epsilon = 1e-9);
        assert_abs_diff_eq!(report.risks.get(Condition::Obesity), 41.1, epsilon = 1e-9);
        assert_abs_diff_eq!(report.risks.get(Condition::Diabetes), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.risks.get(Condition::Hyperlipidemia), 20.0, epsilon = 1e-9);
        assert_eq!(report.tiers.obesity, RiskTier::Moderate);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn invalid_input_is_rejected_before_prediction() {
        let mut input = reference_adult();
        input.weight = 250.0;
        let err = reference_scorer(OutputLayout::Stacked)
            .score(&input)
            .expect_err("out of range");
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }

    #[test]
    fn feature_contract_mismatch_is_caught() {
        let mut artifact = intercept_only_artifact(OutputLayout::Stacked, [0.0; 4]);
        artifact.feature_names.swap(0, 1);
        let scorer = RiskScorer::new(Arc::new(artifact), ScoringConfig::default());
        assert!(matches!(
            scorer.score(&reference_adult()),
            Err(ScoringError::FeatureContract { .. })
        ));
    }

    #[test]
    fn four_dimensional_output_is_a_shape_mismatch() {
        assert!(matches!(
            four_dimensional().score(&reference_adult()),
            Err(ScoringError::ShapeMismatch(ShapeError::UnsupportedRank(4)))
        ));
    }

    #[test]
    fn unknown_report_is_distinguishable_from_zero_risk() {
        let report = four_dimensional()
            .score_or_unknown(&reference_adult())
            .expect("recovered");
        assert_eq!(report.status, ScoreStatus::Unknown);
        assert_eq!(report.tiers, TierSet::unknown());
        assert!(matches!(report.diagnostics.as_slice(), [Diagnostic::ShapeMismatch { .. }]));

        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["status"], "unknown");
        assert_eq!(json["tiers"]["diabetes"], "unknown");
    }

    #[test]
    fn score_or_unknown_still_propagates_input_errors() {
        let mut input = reference_adult();
        input.age = 101;
        assert!(matches!(
            four_dimensional().score_or_unknown(&input),
            Err(ScoringError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_artifact_is_model_unavailable() {
        let err = load_classifier(Path::new("/nonexistent/riskscope.toml"))
            .expect_err("missing");
        assert!(matches!(err, ScoringError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/riskscope.toml"));
    }

    #[test]
    fn surplus_heads_make_the_model_unavailable() {
        let mut artifact = intercept_only_artifact(OutputLayout::PerCondition, [0.0; 4]);
        let extra = artifact.heads[0].clone();
        artifact.heads.push(extra);
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        artifact.save(file.path()).expect("save");
        let err = load_classifier(file.path()).expect_err("five heads");
        assert!(matches!(
            err,
            ScoringError::ModelUnavailable { source: ModelError::Malformed(_), .. }
        ));
    }

    #[test]
    fn comparison_is_opt_in() {
        let scorer = reference_scorer(OutputLayout::SingleSample);
        let input = reference_adult();
        let plain = scorer.score(&input).expect("score");
        assert!(plain.comparison.is_none());
        let json = serde_json::to_value(&plain).expect("serialize");
        assert!(json.get("comparison").is_none());

        let compared = plain.with_comparison(&input);
        assert_eq!(compared.comparison.as_ref().map(Vec::len), Some(7));
    }
}
