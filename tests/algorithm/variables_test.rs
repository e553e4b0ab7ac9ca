//! Tests for variable construction

use enssex_correlates::algorithm::variables::VariableConstructor;
use enssex_correlates::{AgeGroup, AnalysisError, CondomUseFrequency, DerivationConfig, RawRecord};

use crate::utils::{knowledge_answers, respondent, survey};

#[test]
fn test_scripted_knowledge_scores() {
    let constructor = VariableConstructor::default();
    for score in 0..=6u8 {
        let (derived, answered) = constructor.knowledge_score(&knowledge_answers(score));
        assert_eq!(derived, Some(score));
        assert_eq!(answered, 6);
    }
}

#[test]
fn test_derive_all_counts_nulls() {
    let records = vec![
        respondent(25.0, 1.0, 1.0, 3),
        RawRecord {
            knowledge_items: [None; 6],
            ..respondent(40.0, 999.0, 9.0, 0)
        },
        respondent(17.0, 150.0, 2.0, 6),
    ];

    let (derived, audit) = VariableConstructor::default().derive_all(&survey(records));
    assert_eq!(derived.len(), 3);
    assert_eq!(audit.respondents, 3);
    assert_eq!(audit.null_counts["hiv_knowledge_score"], 1);
    assert_eq!(audit.null_counts["partners_last_year"], 1);
    assert_eq!(audit.null_counts["condom_use_freq"], 1);
    assert_eq!(audit.null_counts["age_group"], 1);
    assert_eq!(audit.partners_capped, 1);

    assert_eq!(derived[0].age_group, Some(AgeGroup::Age18To29));
    assert_eq!(derived[0].condom_use_freq, Some(CondomUseFrequency::Always));
    assert_eq!(derived[0].always_condom, Some(true));
    assert_eq!(derived[1].partners_reported, None);
    assert_eq!(derived[2].partners_reported, Some(150));
    assert_eq!(derived[2].partners_last_year, Some(100));
    assert!(derived[2].partners_capped);
    assert_eq!(derived[2].age_group, None);
}

#[test]
fn test_configured_cap_and_minimum_age() {
    let config = DerivationConfig {
        partner_cap: 10,
        minimum_age: 21.0,
        ..DerivationConfig::default()
    };
    let constructor = VariableConstructor::new(config);
    let record = constructor.derive(0, &respondent(20.0, 12.0, 3.0, 2));
    assert_eq!(record.partners_last_year, Some(10));
    assert_eq!(record.age_group, None);
    assert_eq!(record.always_condom, Some(false));
    assert_eq!(record.ever_condom, Some(false));

    let record = constructor.derive(1, &respondent(21.0, 1.0, 1.0, 2));
    assert_eq!(record.age_group, Some(AgeGroup::Age18To29));
}

#[test]
fn test_minimum_age_never_opens_youngest_group_to_minors() {
    let config = DerivationConfig {
        minimum_age: 12.0,
        ..DerivationConfig::default()
    };
    assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

    let record = VariableConstructor::new(config).derive(0, &respondent(13.0, 1.0, 1.0, 2));
    assert_eq!(record.age_group, None);
}

#[test]
fn test_refused_knowledge_block_is_missing() {
    let raw = RawRecord {
        knowledge_items: [Some(99.0); 6],
        ..respondent(35.0, 1.0, 1.0, 0)
    };
    let record = VariableConstructor::default().derive(0, &raw);
    assert_eq!(record.hiv_knowledge_score, None);
    assert_eq!(record.knowledge_items_answered, 0);
}

#[test]
fn test_rows_keep_source_order() {
    let records: Vec<RawRecord> = (0..5)
        .map(|i| respondent(30.0 + f64::from(i), 1.0, 1.0, 1))
        .collect();
    let (derived, _) = VariableConstructor::default().derive_all(&survey(records));
    let rows: Vec<usize> = derived.iter().map(|r| r.row).collect();
    assert_eq!(rows, vec![0, 1, 2, 3, 4]);
}
