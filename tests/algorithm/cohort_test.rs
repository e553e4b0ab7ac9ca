//! Tests for cohort selection

use enssex_correlates::algorithm::cohort::{CohortFilter, ExclusionReason};
use enssex_correlates::algorithm::variables::VariableConstructor;
use enssex_correlates::RawRecord;

use crate::utils::{respondent, survey};

#[test]
fn test_exclusions_charged_to_first_failing_criterion() {
    let records = vec![
        respondent(30.0, 2.0, 1.0, 4),
        respondent(30.0, 0.0, 9.0, 4),  // no partners and invalid condom code
        respondent(30.0, 1.0, 4.0, 4),  // invalid condom code
        respondent(16.0, 1.0, 2.0, 4),  // under age
        RawRecord { partners: None, ..respondent(30.0, 1.0, 1.0, 4) },
        respondent(85.0, 300.0, 3.0, 0),
    ];
    let (candidates, _) = VariableConstructor::default().derive_all(&survey(records));
    let (dataset, audit) = CohortFilter::new().apply(candidates);

    assert_eq!(audit.initial, 6);
    assert_eq!(audit.retained, 2);
    assert_eq!(audit.dropped, 4);
    assert_eq!(audit.dropped_by_reason[&ExclusionReason::NoRecentPartners], 2);
    assert_eq!(audit.dropped_by_reason[&ExclusionReason::MissingCondomUse], 1);
    assert_eq!(audit.dropped_by_reason[&ExclusionReason::MissingAgeGroup], 1);

    let rows: Vec<usize> = dataset.records().iter().map(|r| r.row).collect();
    assert_eq!(rows, vec![0, 5]);
    // Over-cap respondents stay in the cohort with the capped count
    assert_eq!(dataset.records()[1].partners_last_year, Some(100));
}

#[test]
fn test_reapplying_filter_drops_nothing() {
    let records = (0..40)
        .map(|i| respondent(18.0 + f64::from(i), f64::from(i % 3), f64::from(1 + i % 4), 3))
        .collect();
    let (candidates, _) = VariableConstructor::default().derive_all(&survey(records));
    let (first, _) = CohortFilter::new().apply(candidates);
    let (second, audit) = CohortFilter::new().apply(first.clone().into_records());

    assert_eq!(first, second);
    assert_eq!(audit.dropped, 0);
}

#[test]
fn test_summary_lists_every_step() {
    let (candidates, _) = VariableConstructor::default()
        .derive_all(&survey(vec![respondent(30.0, 0.0, 1.0, 1), respondent(30.0, 1.0, 1.0, 1)]));
    let (_, audit) = CohortFilter::new().apply(candidates);
    let summary = audit.summary();
    assert!(summary.contains("Initial sample: 2"));
    assert!(summary.contains("no sexual partners"));
    assert!(summary.contains("Final analysis sample: 1 (50.0%)"));
}
