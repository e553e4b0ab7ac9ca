//! Tests for reading the primary and alternate survey sources

use std::fs;

use enssex_correlates::loader::{
    DelimitedSource, ParquetSource, RecordSource, load_survey, resolve_source,
};
use enssex_correlates::report::{rows_to_batch, write_parquet};
use enssex_correlates::{AnalysisError, Pipeline, PipelineConfig, SyntheticSurvey};

use crate::utils::scripted_rows;

#[test]
fn test_parquet_source_reads_codebook_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("survey.parquet");
    let batch = rows_to_batch(&scripted_rows(12, 2)).expect("batch");
    write_parquet(&path, &batch).expect("write");

    let survey = load_survey(&ParquetSource::new(&path)).expect("load");
    assert_eq!(survey.len(), 12);
    assert_eq!(survey.source, "survey.parquet");
    assert_eq!(survey.columns.sti_diagnoses.len(), 3);

    let first = &survey.records[0];
    assert_eq!(first.folio.as_deref(), Some("F0000"));
    assert_eq!(first.partners, Some(0.0));
    assert_eq!(first.age, Some(20.0));
    assert_eq!(first.test_reason, Some(1.0));
    assert_eq!(first.no_test_reason, None);

    let third = &survey.records[2];
    assert_eq!(third.partners, Some(3.0));
    assert_eq!(third.condom_use, Some(3.0));
}

#[test]
fn test_both_encodings_give_the_same_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let parquet_path = dir.path().join("survey.parquet");
    let text_path = dir.path().join("survey.txt");
    let generator = SyntheticSurvey::new(200, 17);
    generator.write_parquet(&parquet_path).expect("parquet");
    generator.write_delimited(&text_path, b' ').expect("text");

    let from_parquet = load_survey(&ParquetSource::new(&parquet_path)).expect("parquet load");
    let from_text = load_survey(&DelimitedSource::new(&text_path, b' ')).expect("text load");
    assert_eq!(from_parquet.records, from_text.records);
}

#[test]
fn test_falls_back_to_alternate_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let alternate = dir.path().join("survey.csv");
    SyntheticSurvey::new(30, 1)
        .write_delimited(&alternate, b',')
        .expect("text");

    let config = PipelineConfig {
        primary_source: dir.path().join("missing.parquet"),
        alternate_source: alternate,
        delimiter: ',',
        ..PipelineConfig::default()
    };
    let source = resolve_source(&config).expect("alternate found");
    assert_eq!(source.format_name(), "delimited");
    assert_eq!(load_survey(source.as_ref()).expect("load").len(), 30);
}

#[test]
fn test_no_source_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = PipelineConfig {
        primary_source: dir.path().join("a.parquet"),
        alternate_source: dir.path().join("b.csv"),
        output_dir: dir.path().join("out"),
        ..PipelineConfig::default()
    };
    let result = Pipeline::new(config).expect("valid config").run();
    assert!(matches!(result, Err(AnalysisError::SourceUnavailable { .. })));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_unreadable_primary_does_not_fall_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let primary = dir.path().join("survey.parquet");
    let alternate = dir.path().join("survey.txt");
    fs::write(&primary, b"not a parquet file").expect("write");
    SyntheticSurvey::new(10, 1)
        .write_delimited(&alternate, b' ')
        .expect("text");

    let config = PipelineConfig {
        primary_source: primary,
        alternate_source: alternate,
        ..PipelineConfig::default()
    };
    let result = Pipeline::new(config).expect("valid config").load();
    assert!(matches!(result, Err(AnalysisError::Parquet(_))));
}

#[test]
fn test_missing_required_fields() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Partial {
        folio: String,
        p71: Option<i64>,
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("partial.parquet");
    let rows = vec![Partial { folio: "A".to_string(), p71: Some(1) }];
    write_parquet(&path, &rows_to_batch(&rows).expect("batch")).expect("write");

    match load_survey(&ParquetSource::new(&path)) {
        Err(AnalysisError::SchemaError { missing }) => {
            assert_eq!(missing, vec!["p73".to_string(), "p4 or edad_grupo".to_string()]);
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
}
