use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView2, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use riskscope::adjust::{LifestyleDeltas, LifestyleFactor, ObesityCurve, apply_lifestyle};
use riskscope::features::FEATURE_NAMES;
use riskscope::model::ModelError;
use riskscope::normalize::ShapeError;
use riskscope::{
    Classifier, ClassifierOutput, Condition, ConditionRiskSet, Diagnostic, Gender, RawUserInput,
    RiskScorer, ScoreStatus, ScoringConfig, ScoringError,
};
use std::sync::Arc;

/// A classifier that answers every request with the same payload.
struct Canned {
    names: Vec<String>,
    output: ClassifierOutput,
}

impl Canned {
    fn scorer(output: ClassifierOutput) -> RiskScorer<Canned> {
        let names = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        RiskScorer::new(Arc::new(Canned { names, output }), ScoringConfig::default())
    }
}

impl Classifier for Canned {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict_proba(&self, _: ArrayView2<f64>) -> Result<ClassifierOutput, ModelError> {
        Ok(self.output.clone())
    }
}

fn per_condition(positives: [f64; 4]) -> ClassifierOutput {
    ClassifierOutput::PerCondition(
        positives
            .iter()
            .map(|&p| Array2::from_shape_vec((1, 2), vec![1.0 - p, p]).expect("shape"))
            .collect(),
    )
}

fn reference_adult() -> RawUserInput {
    RawUserInput {
        gender: Gender::Male,
        age: 40,
        height: 170.0,
        weight: 70.0,
        systolic_bp: 120.0,
        diastolic_bp: 80.0,
        smokes: false,
        drinks: false,
        exercises: false,
    }
}

fn random_input(rng: &mut StdRng) -> RawUserInput {
    RawUserInput {
        gender: if rng.gen_bool(0.5) { Gender::Male } else { Gender::Female },
        age: rng.gen_range(10..=100),
        height: rng.gen_range(120.0..=250.0),
        weight: rng.gen_range(30.0..=200.0),
        systolic_bp: rng.gen_range(50.0..=200.0),
        diastolic_bp: rng.gen_range(40.0..=150.0),
        smokes: rng.gen_bool(0.3),
        drinks: rng.gen_bool(0.4),
        exercises: rng.gen_bool(0.5),
    }
}

#[test]
fn reference_adult_scores_as_pinned() {
    let report = Canned::scorer(per_condition([0.30, 0.20, 0.10, 0.25]))
        .score(&reference_adult())
        .expect("score");
    assert_abs_diff_eq!(report.features.bmi, 24.22, epsilon = 1e-12);
    let expected = [27.5, 41.1, 5.0, 20.0];
    for (condition, want) in Condition::ALL.into_iter().zip(expected) {
        assert_abs_diff_eq!(report.risks.get(condition), want, epsilon = 1e-9);
    }
}

#[test]
fn risks_stay_in_bounds_for_random_inputs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let mut positives = [0.0; 4];
        for p in positives.iter_mut() {
            // Deliberately strays outside [0, 1] and occasionally hands back NaN.
            *p = if rng.gen_bool(0.05) {
                f64::NAN
            } else {
                rng.gen_range(-0.2..=1.2)
            };
        }
        let input = random_input(&mut rng);
        let report = Canned::scorer(per_condition(positives))
            .score(&input)
            .expect("valid input scores");
        for (condition, value) in report.risks.iter() {
            assert!(
                value.is_finite() && (0.0..=100.0).contains(&value),
                "{condition} = {value} for {input:?}"
            );
        }
        if positives.iter().any(|p| p.is_nan()) {
            assert!(
                report
                    .diagnostics
                    .iter()
                    .any(|d| matches!(d, Diagnostic::NumericAnomaly { .. }))
            );
        }
    }
}

#[test]
fn obesity_risk_never_falls_as_bmi_rises() {
    let scorer = Canned::scorer(per_condition([0.4, 0.3, 0.2, 0.1]));
    let mut input = reference_adult();
    let mut previous = f64::NEG_INFINITY;
    for step in 0..=170 {
        input.weight = 30.0 + f64::from(step);
        let obesity = scorer.score(&input).expect("score").risks.get(Condition::Obesity);
        assert!(obesity >= previous, "weight {} dropped obesity risk", input.weight);
        previous = obesity;
    }
}

#[test]
fn obesity_curve_is_continuous_at_breakpoints() {
    let curve = ObesityCurve::default();
    for bmi in [16.0, 25.0, 40.0] {
        let at = curve.risk_at(bmi);
        assert_abs_diff_eq!(curve.risk_at(bmi - 1e-9), at, epsilon = 1e-6);
        assert_abs_diff_eq!(curve.risk_at(bmi + 1e-9), at, epsilon = 1e-6);
    }
}

#[test]
fn scoring_is_idempotent() {
    let scorer = Canned::scorer(per_condition([0.55, 0.35, 0.65, 0.45]));
    let mut input = reference_adult();
    input.smokes = true;
    input.age = 66;
    let first = scorer.score(&input).expect("first");
    let second = scorer.score(&input).expect("second");
    assert_eq!(first, second);
}

#[test]
fn every_payload_shape_reads_the_same() {
    let positives = [0.12, 0.34, 0.56, 0.78];
    let stacked = Array3::from_shape_fn((4, 1, 2), |(c, _, k)| {
        if k == 1 { positives[c] } else { 1.0 - positives[c] }
    });
    let single = Array2::from_shape_fn((4, 2), |(c, k)| {
        if k == 1 { positives[c] } else { 1.0 - positives[c] }
    });
    let payloads = [
        per_condition(positives),
        ClassifierOutput::Dense(stacked.into_dyn()),
        ClassifierOutput::Dense(single.into_dyn()),
        ClassifierOutput::Dense(Array1::from(positives.to_vec()).into_dyn()),
    ];

    let input = reference_adult();
    let reports: Vec<_> = payloads
        .into_iter()
        .map(|payload| Canned::scorer(payload).score(&input).expect("score"))
        .collect();
    for report in &reports[1..] {
        assert_eq!(report.risks, reports[0].risks);
    }
}

#[test]
fn lifestyle_order_does_not_matter() {
    let deltas = LifestyleDeltas::default();
    let base = ConditionRiskSet::from_percentages([95.0, 50.0, 3.0, 40.0]);
    let orders = [
        [LifestyleFactor::Smoking, LifestyleFactor::Drinking, LifestyleFactor::Exercise],
        [LifestyleFactor::Exercise, LifestyleFactor::Smoking, LifestyleFactor::Drinking],
        [LifestyleFactor::Drinking, LifestyleFactor::Exercise, LifestyleFactor::Smoking],
    ];
    let results: Vec<_> = orders
        .iter()
        .map(|order| {
            let mut risks = base;
            apply_lifestyle(&mut risks, order, &deltas);
            risks
        })
        .collect();
    assert!(results.iter().all(|r| *r == results[0]));
    assert_eq!(results[0].get(Condition::Hypertension), 100.0);
    assert_eq!(results[0].get(Condition::Obesity), 50.0);
}

#[test]
fn four_dimensional_payload_is_rejected() {
    let scorer = Canned::scorer(ClassifierOutput::Dense(ArrayD::zeros(IxDyn(&[4, 1, 1, 2]))));
    assert!(matches!(
        scorer.score(&reference_adult()),
        Err(ScoringError::ShapeMismatch(ShapeError::UnsupportedRank(4)))
    ));
    let unknown = scorer.score_or_unknown(&reference_adult()).expect("unknown report");
    assert_eq!(unknown.status, ScoreStatus::Unknown);
}

#[test]
fn too_few_outputs_are_rejected() {
    let scorer = Canned::scorer(ClassifierOutput::Dense(
        Array1::from(vec![0.2, 0.3, 0.4]).into_dyn(),
    ));
    assert!(matches!(
        scorer.score(&reference_adult()),
        Err(ScoringError::ShapeMismatch(ShapeError::TooFewConditions { found: 3, expected: 4 }))
    ));
}
