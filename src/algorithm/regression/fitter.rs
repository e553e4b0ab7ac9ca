//! Fitting the model family over the analytic dataset
//!
//! Every specification is an independent job: a failing fit becomes a
//! [`ModelOutcome::Failed`] entry and never affects its siblings. Jobs run
//! on a dedicated rayon pool; results are returned in specification order
//! whatever the scheduling.

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use super::design::{INTERACTION_FULL_MODEL, INTERACTION_REDUCED_MODEL, ModelSpecification};
use super::logistic::{LogisticRegression, ModelEstimator};
use super::result::{InteractionTest, LikelihoodRatioTest, ModelOutcome};
use crate::config::ModelFitConfig;
use crate::models::{AgeGroup, AnalyticDataset, AnalyticRecord};
use crate::utils::create_main_progress_bar;

/// One age-stratified fit
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedOutcome {
    /// Age group the model was restricted to
    pub age_group: AgeGroup,
    /// Cohort members in the age group, before listwise deletion
    pub stratum_size: usize,
    /// Stratum below the configured minimum size
    pub small_sample: bool,
    /// Fit result or failure
    pub outcome: ModelOutcome,
}

/// Everything the model-fitting stage produces
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBatch {
    /// The five base models, in reporting order
    pub base: Vec<ModelOutcome>,
    /// Age by knowledge interaction test
    pub interaction: InteractionTest,
    /// One fit per age group, youngest first
    pub stratified: Vec<StratifiedOutcome>,
}

impl ModelBatch {
    /// Base and stratified outcomes in reporting order
    pub fn outcomes(&self) -> impl Iterator<Item = &ModelOutcome> {
        self.base
            .iter()
            .chain(self.stratified.iter().map(|s| &s.outcome))
    }

    /// Number of specifications attempted
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.base.len() + self.stratified.len()
    }

    /// Number of specifications that converged
    #[must_use]
    pub fn fitted(&self) -> usize {
        self.outcomes().filter(|o| o.is_fitted()).count()
    }

    /// Outcome of a model by name
    #[must_use]
    pub fn get(&self, model_name: &str) -> Option<&ModelOutcome> {
        self.outcomes().find(|o| o.model_name() == model_name)
    }
}

/// Counts reported for the model stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelStageSummary {
    /// Specifications attempted
    pub attempted: usize,
    /// Specifications that converged
    pub fitted: usize,
    /// Specifications that failed
    pub failed: usize,
}

impl From<&ModelBatch> for ModelStageSummary {
    fn from(batch: &ModelBatch) -> Self {
        let attempted = batch.attempted();
        let fitted = batch.fitted();
        Self {
            attempted,
            fitted,
            failed: attempted - fitted,
        }
    }
}

/// Runs the base, interaction and stratified models
pub struct ModelFitter<E: ModelEstimator = LogisticRegression> {
    estimator: E,
    config: ModelFitConfig,
}

impl ModelFitter<LogisticRegression> {
    /// Fitter using Newton-Raphson logistic regression
    #[must_use]
    pub fn new(config: ModelFitConfig) -> Self {
        Self {
            estimator: LogisticRegression::new(config.clone()),
            config,
        }
    }
}

impl<E: ModelEstimator> ModelFitter<E> {
    /// Fitter with a custom estimator
    pub fn with_estimator(estimator: E, config: ModelFitConfig) -> Self {
        Self { estimator, config }
    }

    /// Fit the full model family
    #[must_use]
    pub fn run(&self, dataset: &AnalyticDataset) -> ModelBatch {
        let base_specs = ModelSpecification::standard_models();
        let strata: Vec<(AgeGroup, Vec<AnalyticRecord>)> = AgeGroup::ALL
            .iter()
            .map(|&group| (group, dataset.age_stratum(group)))
            .collect();

        let mut jobs: Vec<(ModelSpecification, &[AnalyticRecord])> = base_specs
            .into_iter()
            .map(|spec| (spec, dataset.records()))
            .collect();
        for (group, records) in &strata {
            if records.len() < self.config.min_stratum_size {
                warn!(
                    "Age group {} has {} respondents, below the minimum of {}; estimates are flagged as small-sample",
                    group,
                    records.len(),
                    self.config.min_stratum_size
                );
            }
            jobs.push((ModelSpecification::stratified(*group), records.as_slice()));
        }

        let mut outcomes = self.fit_jobs(&jobs);
        let stratified_outcomes = outcomes.split_off(jobs.len() - strata.len());
        let base = outcomes;

        let interaction = interaction_test(&base);
        match &interaction {
            InteractionTest::Computed(test) => info!(
                "Interaction test: LR = {:.4}, df = {}, p = {:.4}",
                test.statistic, test.degrees_of_freedom, test.p_value
            ),
            InteractionTest::Unavailable { reason } => {
                warn!("Interaction test unavailable: {reason}");
            }
        }

        let stratified = strata
            .iter()
            .zip(stratified_outcomes)
            .map(|((group, records), outcome)| StratifiedOutcome {
                age_group: *group,
                stratum_size: records.len(),
                small_sample: records.len() < self.config.min_stratum_size,
                outcome,
            })
            .collect();

        let batch = ModelBatch {
            base,
            interaction,
            stratified,
        };
        let summary = ModelStageSummary::from(&batch);
        info!(
            "Model stage: {} of {} specifications converged",
            summary.fitted, summary.attempted
        );
        batch
    }

    /// Fit each specification against its records, preserving job order
    #[must_use]
    pub fn fit_jobs(&self, jobs: &[(ModelSpecification, &[AnalyticRecord])]) -> Vec<ModelOutcome> {
        let pb = create_main_progress_bar(
            jobs.len() as u64,
            Some("Fitting models"),
            self.config.show_progress,
        );

        let fit_one = |(spec, records): &(ModelSpecification, &[AnalyticRecord])| {
            let outcome = self.estimator.fit(spec, records);
            pb.inc(1);
            outcome
        };

        let outcomes: Vec<ModelOutcome> = if self.config.parallel {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.thread_count())
                .build()
            {
                Ok(pool) => pool.install(|| jobs.par_iter().map(fit_one).collect()),
                Err(e) => {
                    warn!("Could not build the model thread pool ({e}), fitting sequentially");
                    jobs.iter().map(fit_one).collect()
                }
            }
        } else {
            jobs.iter().map(fit_one).collect()
        };

        pb.finish_with_message("Models fitted");
        outcomes
    }
}

/// Likelihood-ratio test of the interaction model against its main-effects model
#[must_use]
pub fn interaction_test(base: &[ModelOutcome]) -> InteractionTest {
    let find = |name: &str| base.iter().find(|o| o.model_name() == name);

    let (reduced, full) = match (find(INTERACTION_REDUCED_MODEL), find(INTERACTION_FULL_MODEL)) {
        (Some(ModelOutcome::Fitted(r)), Some(ModelOutcome::Fitted(f))) => (r, f),
        (reduced, full) => {
            let failed: Vec<&str> = [
                (INTERACTION_REDUCED_MODEL, reduced),
                (INTERACTION_FULL_MODEL, full),
            ]
            .into_iter()
            .filter(|(_, o)| !o.is_some_and(ModelOutcome::is_fitted))
            .map(|(name, _)| name)
            .collect();
            return InteractionTest::Unavailable {
                reason: format!("model(s) not fitted: {}", failed.join(", ")),
            };
        }
    };

    match LikelihoodRatioTest::compare(reduced, full) {
        Ok(test) => InteractionTest::Computed(test),
        Err(reason) => InteractionTest::Unavailable { reason },
    }
}
