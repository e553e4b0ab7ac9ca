//! End-to-end analysis pipeline
//!
//! Load → derive → filter → describe → fit → write. Each stage is exposed on
//! its own so callers (and tests) can run the analysis on an in-memory
//! survey without touching the filesystem.

use std::path::PathBuf;

use log::info;

use crate::algorithm::cohort::{CohortAudit, CohortFilter};
use crate::algorithm::regression::{ModelBatch, ModelFitter};
use crate::algorithm::statistics::{DescriptiveReport, DescriptiveStatistics};
use crate::algorithm::variables::{DerivationAudit, VariableConstructor};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::loader::load_configured_survey;
use crate::models::{AnalyticDataset, AnalyticRecord, RawSurvey};
use crate::report::ResultWriter;

/// Everything computed from one survey
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResults {
    /// Name of the source the survey was read from
    pub source: String,
    /// Null counts of the derived variables
    pub derivation: DerivationAudit,
    /// Cohort flow
    pub cohort: CohortAudit,
    /// The analytic cohort
    pub dataset: AnalyticDataset,
    /// Cross-tabulations and chi-squared tests
    pub descriptives: DescriptiveReport,
    /// Base, interaction and stratified models
    pub models: ModelBatch,
}

impl AnalysisResults {
    /// Render a short text summary of the run
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Source: {}\n", self.source));
        summary.push_str(&self.cohort.summary());
        summary.push('\n');
        summary.push_str(&DescriptiveStatistics::generate_summary(&self.descriptives));
        summary.push_str("\nModels:\n");
        for outcome in self.models.outcomes() {
            match outcome.fitted() {
                Some(result) => summary.push_str(&format!(
                    "  {:<36} n={:<6} pseudo R2 = {:.4}\n",
                    result.model_name, result.n_effective, result.pseudo_r2
                )),
                None => summary.push_str(&format!(
                    "  {:<36} n={:<6} FAILED\n",
                    outcome.model_name(),
                    outcome.n_effective()
                )),
            }
        }
        if let Some(test) = self.models.interaction.computed() {
            summary.push_str(&format!(
                "Interaction test: LR = {:.4}, df = {}, p = {:.4}\n",
                test.statistic, test.degrees_of_freedom, test.p_value
            ));
        }
        summary
    }
}

/// A completed run: the results and the files written
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Analysis results
    pub results: AnalysisResults,
    /// Artifacts written, in write order
    pub artifacts: Vec<PathBuf>,
}

/// Runs the analysis stages with one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline after validating the configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the survey from the configured source
    pub fn load(&self) -> Result<RawSurvey> {
        load_configured_survey(&self.config)
    }

    /// Derive candidate analytic records
    #[must_use]
    pub fn construct_variables(
        &self,
        survey: &RawSurvey,
    ) -> (Vec<AnalyticRecord>, DerivationAudit) {
        VariableConstructor::new(self.config.derivation.clone()).derive_all(survey)
    }

    /// Apply the cohort criteria
    #[must_use]
    pub fn select_cohort(&self, candidates: Vec<AnalyticRecord>) -> (AnalyticDataset, CohortAudit) {
        CohortFilter::new().apply(candidates)
    }

    /// Fit the model family
    #[must_use]
    pub fn fit_models(&self, dataset: &AnalyticDataset) -> ModelBatch {
        ModelFitter::new(self.config.model.clone()).run(dataset)
    }

    /// Run every in-memory stage on a loaded survey
    #[must_use]
    pub fn analyze(&self, survey: &RawSurvey) -> AnalysisResults {
        let (candidates, derivation) = self.construct_variables(survey);
        let (dataset, cohort) = self.select_cohort(candidates);
        info!("{}", cohort.summary().trim_end());

        let descriptives = DescriptiveStatistics::describe(&dataset);
        let models = self.fit_models(&dataset);

        AnalysisResults {
            source: survey.source.clone(),
            derivation,
            cohort,
            dataset,
            descriptives,
            models,
        }
    }

    /// Load, analyse and write every artifact to the output directory
    pub fn run(&self) -> Result<PipelineReport> {
        let survey = self.load()?;
        let results = self.analyze(&survey);

        let writer = ResultWriter::new(&self.config.output_dir)?;
        let artifacts = writer.write_all(&results, &self.config)?;
        info!(
            "Wrote {} artifacts to {}",
            artifacts.len(),
            self.config.output_dir.display()
        );

        Ok(PipelineReport { results, artifacts })
    }
}
