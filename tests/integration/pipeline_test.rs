//! End-to-end pipeline tests

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use enssex_correlates::report::{
    ANALYTIC_CSV, ANALYTIC_PARQUET, MODEL_RESULTS_CSV, MODEL_SUMMARY_CSV, RUN_AUDIT_JSON,
    rows_to_batch, write_parquet,
};
use enssex_correlates::{Pipeline, PipelineConfig, SyntheticSurvey};

use crate::utils::scripted_rows;

fn config_for(primary: &Path, output: &Path) -> PipelineConfig {
    let mut config = PipelineConfig {
        primary_source: primary.to_path_buf(),
        alternate_source: primary.with_extension("csv"),
        output_dir: output.to_path_buf(),
        ..PipelineConfig::default()
    };
    config.model.parallel = false;
    config
}

#[test]
fn test_scripted_cohort_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let primary = dir.path().join("survey.parquet");
    write_parquet(&primary, &rows_to_batch(&scripted_rows(100, 5)).expect("batch"))
        .expect("write");

    let pipeline = Pipeline::new(config_for(&primary, &dir.path().join("out"))).expect("config");
    let survey = pipeline.load().expect("load");
    let (candidates, derivation) = pipeline.construct_variables(&survey);

    let mut scores: BTreeMap<u8, usize> = BTreeMap::new();
    for record in &candidates {
        *scores.entry(record.hiv_knowledge_score.expect("all items answered")).or_insert(0) += 1;
    }
    let expected: BTreeMap<u8, usize> =
        [(0, 15), (1, 15), (2, 14), (3, 14), (4, 14), (5, 14), (6, 14)].into_iter().collect();
    assert_eq!(scores, expected);
    assert_eq!(derivation.null_counts["hiv_knowledge_score"], 0);

    let (dataset, audit) = pipeline.select_cohort(candidates);
    assert_eq!(audit.initial, 100);
    assert_eq!(audit.retained, 95);
    assert_eq!(dataset.len(), 95);
    assert_eq!(
        dataset.records().iter().filter(|r| r.always_condom == Some(true)).count(),
        32
    );

    let mut retained_scores: BTreeMap<u8, usize> = BTreeMap::new();
    for record in dataset.records() {
        *retained_scores.entry(record.hiv_knowledge_score.unwrap_or(u8::MAX)).or_insert(0) += 1;
    }
    let expected: BTreeMap<u8, usize> =
        [(0, 14), (1, 14), (2, 13), (3, 13), (4, 13), (5, 14), (6, 14)].into_iter().collect();
    assert_eq!(retained_scores, expected);
}

#[test]
fn test_run_writes_every_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let primary = dir.path().join("survey.parquet");
    write_parquet(&primary, &rows_to_batch(&scripted_rows(100, 5)).expect("batch"))
        .expect("write");
    let output = dir.path().join("out");

    let report = Pipeline::new(config_for(&primary, &output))
        .expect("config")
        .run()
        .expect("run");
    assert_eq!(report.artifacts.len(), 7);
    assert!(report.artifacts.iter().all(|p| p.is_file()));
    assert_eq!(report.results.cohort.retained, 95);
    assert_eq!(report.results.models.attempted(), 12);

    let results = fs::read_to_string(output.join(MODEL_RESULTS_CSV)).expect("results");
    assert_eq!(
        results.lines().next(),
        Some("model_name,predictor,coefficient,std_error,odds_ratio,ci_low,ci_high,p_value,pseudo_r2,n_effective")
    );

    let summary = fs::read_to_string(output.join(MODEL_SUMMARY_CSV)).expect("summary");
    assert_eq!(summary.lines().count(), 13);

    let analytic = fs::read_to_string(output.join(ANALYTIC_CSV)).expect("analytic");
    assert_eq!(analytic.lines().count(), 96);

    let audit: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join(RUN_AUDIT_JSON)).expect("audit"))
            .expect("json");
    assert_eq!(audit["cohort"]["retained"], 95);
    assert_eq!(audit["cohort"]["dropped_by_reason"]["no_recent_partners"], 5);
    assert_eq!(audit["models"]["attempted"], 12);
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let primary = dir.path().join("survey.parquet");
    SyntheticSurvey::new(800, 11)
        .write_parquet(&primary)
        .expect("write");

    let first_dir = dir.path().join("first");
    let second_dir = dir.path().join("second");
    Pipeline::new(config_for(&primary, &first_dir))
        .expect("config")
        .run()
        .expect("first run");
    let mut parallel = config_for(&primary, &second_dir);
    parallel.model.parallel = true;
    Pipeline::new(parallel).expect("config").run().expect("second run");

    for name in [ANALYTIC_PARQUET, ANALYTIC_CSV, MODEL_RESULTS_CSV, MODEL_SUMMARY_CSV] {
        let a = fs::read(first_dir.join(name)).expect("first artifact");
        let b = fs::read(second_dir.join(name)).expect("second artifact");
        assert!(a == b, "{name} differs between runs");
    }
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{ "output_dir": "custom", "derivation": { "partner_cap": 20 }, "model": { "min_stratum_size": 10 } }"#,
    )
    .expect("write");

    let config = PipelineConfig::from_json_file(&path).expect("config");
    assert_eq!(config.output_dir, Path::new("custom"));
    assert_eq!(config.derivation.partner_cap, 20);
    assert_eq!(config.derivation.partner_missing_codes, vec![999]);
    assert_eq!(config.model.min_stratum_size, 10);
    assert_eq!(config.model.max_iterations, 50);
}
