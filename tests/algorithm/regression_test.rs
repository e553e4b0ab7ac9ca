//! Tests for the base model family and the interaction test

use enssex_correlates::algorithm::cohort::CohortFilter;
use enssex_correlates::algorithm::regression::{INTERCEPT, InteractionTest, ModelFitter};
use enssex_correlates::algorithm::variables::VariableConstructor;
use enssex_correlates::loader::{SourceTable, records_from_table};
use enssex_correlates::{AnalyticDataset, ModelFitConfig, SyntheticSurvey};

use crate::utils::sequential_fit_config;

fn synthetic_cohort(respondents: usize, seed: u64) -> AnalyticDataset {
    let batch = SyntheticSurvey::new(respondents, seed)
        .generate()
        .expect("synthetic batch");
    let table = SourceTable {
        schema: batch.schema(),
        batches: vec![batch],
    };
    let survey = records_from_table(&table, "synthetic").expect("codebook columns");
    let (candidates, _) = VariableConstructor::default().derive_all(&survey);
    CohortFilter::new().apply(candidates).0
}

#[test]
fn test_base_models_fit_in_order() {
    let dataset = synthetic_cohort(3000, 42);
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);

    let names: Vec<&str> = batch.base.iter().map(|o| o.model_name()).collect();
    assert_eq!(
        names,
        vec![
            "model1_age_knowledge",
            "model2_add_partners",
            "model3_add_sti_testing",
            "model4_add_prep",
            "model5_age_knowledge_interaction",
        ]
    );
    assert!(batch.base.iter().all(|o| o.is_fitted()));

    let model5 = batch.base[4].fitted().expect("interaction model");
    let rows: Vec<&str> = model5.coefficients.iter().map(|c| c.predictor.as_str()).collect();
    assert_eq!(
        rows,
        vec![
            INTERCEPT,
            "age_group",
            "hiv_knowledge_score",
            "partners_last_year",
            "age_group:hiv_knowledge_score",
        ]
    );
}

#[test]
fn test_fit_statistics_are_consistent() {
    let dataset = synthetic_cohort(2000, 7);
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);

    for result in batch.outcomes().filter_map(|o| o.fitted()) {
        let k = result.parameter_count() as f64;
        assert!((result.aic - (-2.0 * result.log_likelihood + 2.0 * k)).abs() < 1e-9);
        assert!(
            (result.bic - (-2.0 * result.log_likelihood + k * (result.n_effective as f64).ln()))
                .abs()
                < 1e-9
        );
        assert!(result.log_likelihood >= result.null_log_likelihood - 1e-9);
        assert!(result.pseudo_r2 > -1e-12 && result.pseudo_r2 <= 1.0);

        for c in &result.coefficients {
            assert!((c.odds_ratio - c.coefficient.exp()).abs() <= 1e-12 * c.odds_ratio.max(1.0));
            assert!(c.ci_low <= c.odds_ratio && c.odds_ratio <= c.ci_high);
            assert!((0.0..=1.0).contains(&c.p_value));
            assert!(c.std_error > 0.0);
        }
    }
}

#[test]
fn test_knowledge_effect_is_recovered() {
    // The generator raises the log-odds of always using a condom by 0.3 per knowledge point
    let dataset = synthetic_cohort(6000, 2024);
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);
    let model2 = batch.get("model2_add_partners").and_then(|o| o.fitted()).expect("model 2");

    let knowledge = model2.coefficient("hiv_knowledge_score").expect("knowledge row");
    assert!(knowledge.coefficient > 0.0);
    assert!(knowledge.ci_low > 1.0);
    let age = model2.coefficient("age_group").expect("age row");
    assert!(age.coefficient < 0.0);
}

#[test]
fn test_interaction_test_nested_models() {
    let dataset = synthetic_cohort(2000, 3);
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);

    let InteractionTest::Computed(test) = &batch.interaction else {
        panic!("interaction test should be computed: {:?}", batch.interaction);
    };
    let reduced = batch.get("model2_add_partners").and_then(|o| o.fitted()).expect("model 2");
    let full = batch
        .get("model5_age_knowledge_interaction")
        .and_then(|o| o.fitted())
        .expect("model 5");

    assert!(test.statistic >= 0.0);
    assert_eq!(test.degrees_of_freedom, full.parameter_count() - reduced.parameter_count());
    assert_eq!(test.degrees_of_freedom, 1);
    assert_eq!(test.n_effective, reduced.n_effective);
    assert!((0.0..=1.0).contains(&test.p_value));
}

#[test]
fn test_parallel_and_sequential_agree() {
    let dataset = synthetic_cohort(1500, 99);
    let sequential = ModelFitter::new(sequential_fit_config()).run(&dataset);
    let parallel = ModelFitter::new(ModelFitConfig {
        parallel: true,
        threads: Some(4),
        ..ModelFitConfig::default()
    })
    .run(&dataset);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_models_with_missing_predictors_use_fewer_rows() {
    let dataset = synthetic_cohort(2000, 5);
    let batch = ModelFitter::new(sequential_fit_config()).run(&dataset);
    let model1 = batch.base[0].fitted().expect("model 1");
    let model4 = batch.base[3].fitted().expect("model 4");
    // Model 4 needs STI, testing and PrEP answers on top of model 1's variables
    assert!(model4.n_effective < model1.n_effective);
    assert_eq!(model1.n_effective + model1.rows_dropped, dataset.len());
    assert_eq!(model4.n_effective + model4.rows_dropped, dataset.len());
}
