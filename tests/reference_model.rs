use riskscope::io::{BatchRow, read_batch, write_batch};
use riskscope::model::{LogisticArtifact, OutputLayout};
use riskscope::tier::RiskTier;
use riskscope::{
    Condition, Gender, RawUserInput, RiskScorer, ScoreStatus, ScoringConfig, ScoringError,
    load_classifier,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn reference_model_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("models/reference_classifier.toml")
}

fn adult(age: u32, weight: f64, smokes: bool) -> RawUserInput {
    RawUserInput {
        gender: Gender::Female,
        age,
        height: 162.0,
        weight,
        systolic_bp: 128.0,
        diastolic_bp: 84.0,
        smokes,
        drinks: false,
        exercises: !smokes,
    }
}

#[test]
fn bundled_artifact_loads_and_scores() {
    let classifier = load_classifier(&reference_model_path()).expect("bundled artifact");
    assert_eq!(classifier.output_layout, OutputLayout::PerCondition);
    assert_eq!(classifier.heads.len(), Condition::COUNT);

    let scorer = RiskScorer::new(classifier, ScoringConfig::default());
    let report = scorer.score(&adult(52, 68.0, false)).expect("score");
    assert_eq!(report.status, ScoreStatus::Scored);
    assert!(report.diagnostics.is_empty());
    for condition in Condition::ALL {
        let value = report.risks.get(condition);
        assert!((0.0..=100.0).contains(&value));
        assert_ne!(report.tiers.get(condition), RiskTier::Unknown);
    }
}

#[test]
fn cache_hands_out_one_shared_artifact() {
    let first = load_classifier(&reference_model_path()).expect("first");
    let relative = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/../models/reference_classifier.toml");
    let second = load_classifier(&relative).expect("second");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn heavier_smoker_scores_higher() {
    let scorer = RiskScorer::new(
        load_classifier(&reference_model_path()).expect("artifact"),
        ScoringConfig::default(),
    );
    let lean = scorer.score(&adult(45, 55.0, false)).expect("lean");
    let heavy = scorer.score(&adult(45, 95.0, true)).expect("heavy");
    for condition in Condition::ALL {
        assert!(
            heavy.risks.get(condition) > lean.risks.get(condition),
            "{condition}: {} <= {}",
            heavy.risks.get(condition),
            lean.risks.get(condition)
        );
    }
}

#[test]
fn artifact_survives_save_and_load() {
    let original = LogisticArtifact::load(&reference_model_path()).expect("load");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("copy.toml");
    original.save(&path).expect("save");
    let copy = LogisticArtifact::load(&path).expect("reload");
    assert_eq!(copy.feature_names, original.feature_names);
    assert_eq!(copy.heads.len(), original.heads.len());
    for (a, b) in copy.heads.iter().zip(&original.heads) {
        assert_eq!(a.condition, b.condition);
        assert_eq!(a.coefficients, b.coefficients);
    }
}

#[test]
fn batch_file_round_trips_through_the_scorer() {
    let scorer = RiskScorer::new(
        load_classifier(&reference_model_path()).expect("artifact"),
        ScoringConfig::default(),
    );
    let tsv = "gender\tage\theight\tweight\tsystolic_bp\tdiastolic_bp\tsmokes\n\
               male\t58\t175\t88\t142\t91\ttrue\n\
               female\t7\t150\t45\t110\t70\tfalse\n\
               female\tthirty\t150\t45\t110\t70\tfalse\n\
               female\t35\t158\t52\t112\t72\tfalse\n";
    let records = read_batch(tsv.as_bytes()).expect("parse");
    let rows: Vec<BatchRow> = records
        .iter()
        .enumerate()
        .map(|(i, record)| match record {
            Ok(input) => BatchRow::from_result(i + 1, &scorer.score_or_unknown(input)),
            Err(e) => BatchRow::failed(i + 1, e.to_string()),
        })
        .collect();

    assert_eq!(rows[0].status, "scored");
    assert!(rows[0].hypertension.is_some());
    assert_eq!(rows[1].status, "error");
    let too_young = records[1].as_ref().expect("parsable record");
    assert!(matches!(
        scorer.score(too_young),
        Err(ScoringError::InvalidInput(_))
    ));
    assert_eq!(rows[2].status, "error");
    assert_eq!(rows[3].status, "scored");
    assert_eq!(rows[3].record, 4);

    let mut out = Vec::new();
    write_batch(&mut out, &rows).expect("write");
    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.lines().count(), 5);
}
