//! Property tests for derivation, cohort selection and model inference

use proptest::prelude::*;

use enssex_correlates::algorithm::cohort::CohortFilter;
use enssex_correlates::algorithm::regression::{
    InteractionTest, LogisticRegression, ModelEstimator, ModelFitter, ModelSpecification,
};
use enssex_correlates::algorithm::variables::VariableConstructor;
use enssex_correlates::{CondomUseFrequency, DerivationConfig, RawRecord};

use crate::utils::{cohort, respondent, survey};

fn code(choices: &'static [f64]) -> impl Strategy<Value = Option<f64>> {
    prop::option::of(prop::sample::select(choices))
}

prop_compose! {
    fn raw_record()(
        age in prop::option::of(10.0f64..95.0),
        partners in prop::option::of(prop_oneof![
            (0u32..300).prop_map(f64::from),
            Just(999.0),
            Just(-1.0),
            Just(2.5),
        ]),
        condom_use in code(&[1.0, 2.0, 3.0, 4.0, 9.0]),
        knowledge in prop::array::uniform6(code(&[1.0, 2.0, 9.0])),
        sti in prop::collection::vec(code(&[1.0, 2.0, 9.0]), 0..4),
        tested in code(&[1.0, 2.0, 9.0]),
        prep in code(&[1.0, 2.0, 99.0]),
    ) -> RawRecord {
        RawRecord {
            age,
            partners,
            condom_use,
            knowledge_items: knowledge,
            sti_diagnoses: sti.into_iter().collect(),
            tested_hiv: tested,
            prep_awareness: prep,
            ..RawRecord::default()
        }
    }
}

prop_compose! {
    fn fit_fixture()(
        rows in prop::collection::vec((18.0f64..90.0, 1u32..12, prop::bool::ANY, 0u8..=6, prop::bool::ANY), 40..120)
    ) -> Vec<RawRecord> {
        rows.into_iter()
            .map(|(age, partners, always, score, tested)| RawRecord {
                tested_hiv: Some(if tested { 1.0 } else { 2.0 }),
                ..respondent(age, f64::from(partners), if always { 1.0 } else { 2.0 }, score)
            })
            .collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn condom_projections_follow_frequency(raw in raw_record()) {
        let record = VariableConstructor::default().derive(0, &raw);
        match record.condom_use_freq {
            Some(freq) => {
                prop_assert_eq!(record.always_condom, Some(freq == CondomUseFrequency::Always));
                prop_assert_eq!(record.ever_condom, Some(freq != CondomUseFrequency::Never));
            }
            None => {
                prop_assert_eq!(record.always_condom, None);
                prop_assert_eq!(record.ever_condom, None);
            }
        }
    }

    #[test]
    fn knowledge_score_in_range_and_null_only_when_unanswered(raw in raw_record()) {
        let record = VariableConstructor::default().derive(0, &raw);
        let all_missing = raw.knowledge_items.iter().all(Option::is_none);
        prop_assert_eq!(record.hiv_knowledge_score.is_none(), all_missing);
        if let Some(score) = record.hiv_knowledge_score {
            prop_assert!(score <= 6);
            prop_assert!(score <= record.knowledge_items_answered);
        }
    }

    #[test]
    fn partner_cap_only_clamps(raw in raw_record(), cap in 2u32..150) {
        let config = DerivationConfig { partner_cap: cap, ..DerivationConfig::default() };
        let record = VariableConstructor::new(config).derive(0, &raw);
        if let (Some(capped), Some(reported)) =
            (record.partners_last_year, record.partners_reported)
        {
            prop_assert!(capped <= cap);
            if reported < cap {
                prop_assert_eq!(capped, reported);
            }
            prop_assert_eq!(record.partners_capped, reported > cap);
        } else {
            prop_assert!(record.partners_last_year.is_none() && record.partners_reported.is_none());
        }
    }

    #[test]
    fn cohort_filter_is_idempotent(records in prop::collection::vec(raw_record(), 0..60)) {
        let (candidates, _) = VariableConstructor::default().derive_all(&survey(records));
        let (first, audit) = CohortFilter::new().apply(candidates);
        prop_assert_eq!(audit.initial, audit.retained + audit.dropped);
        prop_assert_eq!(audit.dropped_by_reason.values().sum::<usize>(), audit.dropped);

        let (second, again) = CohortFilter::new().apply(first.clone().into_records());
        prop_assert_eq!(again.dropped, 0);
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn odds_ratios_are_exponentiated_coefficients(records in fit_fixture()) {
        let dataset = cohort(records);
        let spec = ModelSpecification::standard_models().remove(1);
        let outcome = LogisticRegression::default().fit(&spec, dataset.records());
        if let Some(result) = outcome.fitted() {
            for c in &result.coefficients {
                let tolerance = 1e-12 * c.odds_ratio.max(1.0);
                prop_assert!((c.odds_ratio - c.coefficient.exp()).abs() <= tolerance);
                prop_assert!(c.ci_low <= c.odds_ratio && c.odds_ratio <= c.ci_high);
            }
        }
    }

    #[test]
    fn interaction_lr_statistic_is_non_negative(records in fit_fixture()) {
        let dataset = cohort(records);
        let batch = ModelFitter::new(crate::utils::sequential_fit_config()).run(&dataset);
        if let InteractionTest::Computed(test) = &batch.interaction {
            let reduced = batch.get(&test.reduced_model).and_then(|o| o.fitted());
            let full = batch.get(&test.full_model).and_then(|o| o.fitted());
            prop_assert!(test.statistic >= 0.0);
            prop_assert!((0.0..=1.0).contains(&test.p_value));
            if let (Some(reduced), Some(full)) = (reduced, full) {
                prop_assert_eq!(
                    test.degrees_of_freedom,
                    full.parameter_count() - reduced.parameter_count()
                );
            }
        }
    }
}
