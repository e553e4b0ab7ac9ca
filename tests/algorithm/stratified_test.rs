//! Tests for the age-stratified model family

use enssex_correlates::algorithm::regression::ModelFitter;
use enssex_correlates::{AgeGroup, FitError, ModelFitConfig, ModelOutcome, RawRecord};

use crate::utils::{cohort, respondent, sequential_fit_config};

const ALWAYS: f64 = 1.0;
const NEVER: f64 = 3.0;

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Three age groups with known behaviour, the other four left empty
fn stratified_fixture() -> Vec<RawRecord> {
    let mut records = Vec::new();

    // 18-29: scores 2 and 5, one partner each; 3/10 and 7/10 always
    for i in 0..10 {
        records.push(respondent(25.0, 1.0, if i < 3 { ALWAYS } else { NEVER }, 2));
        records.push(respondent(25.0, 1.0, if i < 7 { ALWAYS } else { NEVER }, 5));
    }

    // 30-39: high scorers always, low scorers never
    for i in 0..12 {
        let partners = f64::from(1 + i % 3);
        records.push(respondent(35.0, partners, ALWAYS, 5 + (i % 2) as u8));
        records.push(respondent(35.0, partners, NEVER, 1 + (i % 2) as u8));
    }

    // 40-49: every (score, partners) cell holds 2 of 5 always, so both slopes are 0
    for i in 0..105u32 {
        let condom = if i % 5 < 2 { ALWAYS } else { NEVER };
        records.push(respondent(45.0, f64::from(1 + i % 3), condom, (i % 7) as u8));
    }

    records
}

fn stratum(
    outcomes: &[enssex_correlates::algorithm::regression::StratifiedOutcome],
    group: AgeGroup,
) -> &ModelOutcome {
    &outcomes
        .iter()
        .find(|s| s.age_group == group)
        .expect("every age group is fitted")
        .outcome
}

#[test]
fn test_separated_stratum_fails_alone() {
    let dataset = cohort(stratified_fixture());
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);
    assert_eq!(batch.stratified.len(), 7);

    let separated = stratum(&batch.stratified, AgeGroup::Age30To39);
    let failure = separated.failure().expect("perfect separation");
    assert_eq!(failure.model, "stratified_30_39");
    assert_eq!(failure.stratum, Some(AgeGroup::Age30To39));
    assert_eq!(failure.n_effective, 24);

    assert!(stratum(&batch.stratified, AgeGroup::Age18To29).is_fitted());
    assert!(stratum(&batch.stratified, AgeGroup::Age40To49).is_fitted());
}

#[test]
fn test_two_point_stratum_matches_closed_form() {
    let dataset = cohort(stratified_fixture());
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);
    let result = stratum(&batch.stratified, AgeGroup::Age18To29)
        .fitted()
        .expect("converges");

    let slope = (logit(0.7) - logit(0.3)) / 3.0;
    let intercept = logit(0.3) - 2.0 * slope;

    assert_eq!(result.dropped_predictors, vec!["partners_last_year"]);
    assert_eq!(result.n_effective, 20);
    let knowledge = result.coefficient("hiv_knowledge_score").expect("slope");
    assert!((knowledge.coefficient - slope).abs() < 1e-7);
    assert!((result.coefficients[0].coefficient - intercept).abs() < 1e-7);
}

#[test]
fn test_balanced_stratum_has_zero_slopes() {
    let dataset = cohort(stratified_fixture());
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);
    let result = stratum(&batch.stratified, AgeGroup::Age40To49)
        .fitted()
        .expect("converges");

    assert_eq!(result.n_effective, 105);
    assert!(result.dropped_predictors.is_empty());
    assert!((result.coefficients[0].coefficient - logit(0.4)).abs() < 1e-7);
    for name in ["hiv_knowledge_score", "partners_last_year"] {
        let c = result.coefficient(name).expect("slope row");
        assert!(c.coefficient.abs() < 1e-7, "{name}: {}", c.coefficient);
        assert!((c.odds_ratio - 1.0).abs() < 1e-6);
        assert!(c.p_value > 0.99);
    }
}

#[test]
fn test_empty_and_small_strata_are_flagged() {
    let dataset = cohort(stratified_fixture());
    let batch = ModelFitter::new(ModelFitConfig {
        min_stratum_size: 30,
        ..sequential_fit_config()
    })
    .run(&dataset);

    for s in &batch.stratified {
        match s.age_group {
            AgeGroup::Age18To29 => assert_eq!((s.stratum_size, s.small_sample), (20, true)),
            AgeGroup::Age30To39 => assert_eq!((s.stratum_size, s.small_sample), (24, true)),
            AgeGroup::Age40To49 => assert_eq!((s.stratum_size, s.small_sample), (105, false)),
            _ => {
                assert_eq!(s.stratum_size, 0);
                assert!(s.small_sample);
                assert_eq!(
                    s.outcome.failure().map(|f| f.cause.clone()),
                    Some(FitError::InsufficientObservations { n: 0, parameters: 3 })
                );
            }
        }
    }
}

#[test]
fn test_failed_strata_do_not_affect_base_models() {
    let dataset = cohort(stratified_fixture());
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);
    assert_eq!(batch.attempted(), 12);
    assert!(batch.base[0].is_fitted());
    assert_eq!(batch.base[0].n_effective(), dataset.len());
}
