use hpi_engine::intake::{import_answers, CsvAnswerImporter, MarkdownAnswerImporter};
use hpi_engine::scoring::{
    EngineError, HpiEngine, MetricRegistry, RawAnswerSet, ScoreBand, TrendConfig,
};
use proptest::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn csv_fixture_scores_reproducibly() {
    let engine = HpiEngine::default();
    let raw = CsvAnswerImporter::from_path(fixture("answers.csv")).expect("fixture parses");

    let scorecard = engine.score(&raw).expect("fixture scores");

    let expected = [
        ("relations_love", 77.777_777_78),
        ("relations_family", 94.444_444_44),
        ("friends", 44.444_444_44),
        ("career", 72.222_222_22),
        ("physical_health", 44.444_444_44),
        ("mental_health", 61.111_111_11),
        ("hobbies", 11.111_111_11),
        ("wealth", 66.666_666_67),
    ];
    for ((domain, score), entry) in expected.iter().zip(&scorecard.scores) {
        assert_eq!(entry.domain, *domain);
        assert_close(entry.score, *score);
    }

    assert_close(scorecard.composite.value, 36.526_181_35);
    assert_close(scorecard.composite.mean, 59.027_777_78);
    let ranked: Vec<_> = scorecard
        .composite
        .weights
        .iter()
        .map(|weight| weight.domain.as_str())
        .collect();
    assert_eq!(
        ranked,
        vec![
            "hobbies",
            "friends",
            "physical_health",
            "mental_health",
            "wealth",
            "career",
            "relations_love",
            "relations_family",
        ]
    );
    assert_eq!(scorecard.composite.band(), ScoreBand::NeedsAttention);

    let again = engine
        .score(&CsvAnswerImporter::from_path(fixture("answers.csv")).expect("fixture parses"))
        .expect("fixture scores");
    assert_eq!(
        again.composite.value.to_bits(),
        scorecard.composite.value.to_bits()
    );
}

#[test]
fn markdown_report_matches_csv_answers() {
    let registry = MetricRegistry::standard();
    let engine = HpiEngine::new(registry.clone(), TrendConfig::default()).expect("valid registry");

    let from_markdown = import_answers(fixture("report.md"), &registry).expect("markdown parses");
    let from_csv = import_answers(fixture("answers.csv"), &registry).expect("csv parses");

    assert_eq!(
        engine.score(&from_markdown).expect("markdown scores"),
        engine.score(&from_csv).expect("csv scores")
    );
}

#[test]
fn markdown_missing_section_fails_validation() {
    let registry = MetricRegistry::standard();
    let content = std::fs::read_to_string(fixture("report.md")).expect("fixture readable");
    let truncated = content
        .split("## 8.")
        .next()
        .expect("content before wealth section");

    let raw = MarkdownAnswerImporter::from_str(truncated, &registry).expect("parses");
    match HpiEngine::default().score(&raw) {
        Err(EngineError::Validation(err)) => assert_eq!(err.domain(), "wealth"),
        other => panic!("expected missing wealth domain, got {other:?}"),
    }
}

#[test]
fn custom_registry_changes_scale_and_domains() {
    let registry = MetricRegistry::from_path(fixture("registry-mini.json")).expect("registry loads");
    let engine = HpiEngine::new(registry, TrendConfig::default()).expect("valid registry");

    let raw = RawAnswerSet::new()
        .with_answers("\u{1f634}", &[5, 4, 3])
        .with_answers("concentration", &[2, 2, 5]);
    let scorecard = engine.score(&raw).expect("scores");

    assert_eq!(scorecard.scores[0].domain, "sleep");
    assert_close(scorecard.scores[0].score, 75.0);
    assert_close(scorecard.scores[1].score, 100.0 / 6.0);
    assert_close(scorecard.composite.value, (2.0 * 100.0 / 6.0 + 75.0) / 3.0);

    let out_of_scale = RawAnswerSet::new()
        .with_answers("sleep", &[6, 4, 3])
        .with_answers("focus", &[2, 2, 5]);
    assert!(matches!(
        engine.score(&out_of_scale),
        Err(EngineError::Validation(_))
    ));
}

fn valid_answer_set() -> impl Strategy<Value = RawAnswerSet> {
    let registry = MetricRegistry::standard();
    let keys: Vec<String> = registry.domains().iter().map(|d| d.key.clone()).collect();
    prop::collection::vec(prop::collection::vec(1i64..=4, 6), keys.len()).prop_map(move |rows| {
        keys.iter()
            .cloned()
            .zip(rows)
            .collect::<RawAnswerSet>()
    })
}

proptest! {
    #[test]
    fn every_valid_answer_set_scores_within_bounds(raw in valid_answer_set()) {
        let scorecard = HpiEngine::default().score(&raw).expect("valid set scores");
        for entry in &scorecard.scores {
            prop_assert!((0.0..=100.0).contains(&entry.score));
        }
        prop_assert!((0.0..=100.0).contains(&scorecard.composite.value));
        prop_assert!(scorecard.composite.value <= scorecard.composite.mean + 1e-9);
    }
}
