//! Output artifacts
//!
//! Typed rows are converted to Arrow record batches with `serde_arrow` and
//! written as Parquet or CSV; the run audit is JSON. Nothing written here
//! depends on the clock, so identical inputs give byte-identical files.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow_schema::FieldRef;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::algorithm::cohort::CohortAudit;
use crate::algorithm::regression::{InteractionTest, ModelOutcome, ModelStageSummary};
use crate::algorithm::statistics::{ChiSquareTest, CrosstabRow};
use crate::algorithm::variables::DerivationAudit;
use crate::config::{DerivationConfig, ModelFitConfig, PipelineConfig};
use crate::error::util::{ensure_directory, safe_create_file};
use crate::error::Result;
use crate::models::{AgeGroup, AnalyticRecord};
use crate::pipeline::AnalysisResults;

/// Analytic dataset as Parquet
pub const ANALYTIC_PARQUET: &str = "analytic_dataset.parquet";
/// Analytic dataset as CSV
pub const ANALYTIC_CSV: &str = "analytic_dataset.csv";
/// One row per coefficient of every converged model
pub const MODEL_RESULTS_CSV: &str = "model_results.csv";
/// One row per attempted model
pub const MODEL_SUMMARY_CSV: &str = "model_summary.csv";
/// Condom use by correlates
pub const CROSSTABS_CSV: &str = "condom_use_crosstabs.csv";
/// Chi-squared tests of the cross-tabulations
pub const ASSOCIATION_TESTS_CSV: &str = "association_tests.csv";
/// Cohort flow, derivation nulls and model failures
pub const RUN_AUDIT_JSON: &str = "run_audit.json";

/// One analytic record as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticRow {
    pub row: u64,
    pub folio: Option<String>,
    pub gender: Option<i64>,
    pub age_years: Option<f64>,
    pub age_group: Option<u8>,
    pub age_group_label: Option<String>,
    pub hiv_knowledge_score: Option<u8>,
    pub knowledge_items_answered: u8,
    pub condom_use_freq: Option<u8>,
    pub condom_use_label: Option<String>,
    pub always_condom: Option<bool>,
    pub ever_condom: Option<bool>,
    pub partners_reported: Option<u32>,
    pub partners_last_year: Option<u32>,
    pub partners_capped: bool,
    pub multiple_partners: Option<bool>,
    pub any_sti: Option<bool>,
    pub hiv_diagnosis: Option<bool>,
    pub tested_hiv_12mo: Option<bool>,
    pub test_reason: Option<i64>,
    pub no_test_reason: Option<i64>,
    pub knows_prep: Option<bool>,
}

impl From<&AnalyticRecord> for AnalyticRow {
    fn from(r: &AnalyticRecord) -> Self {
        Self {
            row: r.row as u64,
            folio: r.folio.clone(),
            gender: r.gender,
            age_years: r.age_years,
            age_group: r.age_group.map(AgeGroup::code),
            age_group_label: r.age_group.map(|g| g.label().to_string()),
            hiv_knowledge_score: r.hiv_knowledge_score,
            knowledge_items_answered: r.knowledge_items_answered,
            condom_use_freq: r.condom_use_freq.map(|f| f.code()),
            condom_use_label: r.condom_use_freq.map(|f| f.label().to_string()),
            always_condom: r.always_condom,
            ever_condom: r.ever_condom,
            partners_reported: r.partners_reported,
            partners_last_year: r.partners_last_year,
            partners_capped: r.partners_capped,
            multiple_partners: r.multiple_partners,
            any_sti: r.any_sti,
            hiv_diagnosis: r.hiv_diagnosis,
            tested_hiv_12mo: r.tested_hiv_12mo,
            test_reason: r.test_reason,
            no_test_reason: r.no_test_reason,
            knows_prep: r.knows_prep,
        }
    }
}

/// One coefficient of a converged model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResultRow {
    pub model_name: String,
    pub predictor: String,
    pub coefficient: f64,
    pub std_error: f64,
    pub odds_ratio: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub p_value: f64,
    pub pseudo_r2: f64,
    pub n_effective: u64,
}

/// Fit statistics, or the failure, of one attempted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummaryRow {
    pub model_name: String,
    pub stratum: Option<String>,
    pub status: String,
    pub failure_reason: Option<String>,
    pub n_effective: u64,
    pub rows_dropped: Option<u64>,
    pub parameters: Option<u64>,
    /// Non-estimable terms, `;`-separated
    pub dropped_predictors: String,
    pub log_likelihood: Option<f64>,
    pub null_log_likelihood: Option<f64>,
    pub pseudo_r2: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub iterations: Option<u64>,
    pub stratum_size: Option<u64>,
    pub small_sample: bool,
}

impl ModelSummaryRow {
    fn new(outcome: &ModelOutcome, stratum_size: Option<usize>, small_sample: bool) -> Self {
        let mut row = Self {
            model_name: outcome.model_name().to_string(),
            stratum: outcome.stratum().map(|g| g.label().to_string()),
            status: "converged".to_string(),
            failure_reason: None,
            n_effective: outcome.n_effective() as u64,
            rows_dropped: None,
            parameters: None,
            dropped_predictors: String::new(),
            log_likelihood: None,
            null_log_likelihood: None,
            pseudo_r2: None,
            aic: None,
            bic: None,
            iterations: None,
            stratum_size: stratum_size.map(|n| n as u64),
            small_sample,
        };

        match outcome {
            ModelOutcome::Fitted(r) => {
                row.rows_dropped = Some(r.rows_dropped as u64);
                row.parameters = Some(r.parameter_count() as u64);
                row.dropped_predictors = r.dropped_predictors.iter().join(";");
                row.log_likelihood = Some(r.log_likelihood);
                row.null_log_likelihood = Some(r.null_log_likelihood);
                row.pseudo_r2 = Some(r.pseudo_r2);
                row.aic = Some(r.aic);
                row.bic = Some(r.bic);
                row.iterations = Some(r.iterations as u64);
            }
            ModelOutcome::Failed(f) => {
                row.status = "failed".to_string();
                row.failure_reason = Some(f.cause.to_string());
            }
        }
        row
    }
}

/// A failed model as listed in the audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub model: String,
    pub stratum: Option<AgeGroup>,
    pub n_effective: usize,
    pub reason: String,
}

/// Machine-readable record of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunAudit<'a> {
    pub source: &'a str,
    pub derivation_settings: &'a DerivationConfig,
    pub model_settings: &'a ModelFitConfig,
    pub derivation: &'a DerivationAudit,
    pub cohort: &'a CohortAudit,
    pub age_group_counts: BTreeMap<AgeGroup, usize>,
    pub models: ModelStageSummary,
    pub failures: Vec<FailureEntry>,
    pub small_sample_strata: Vec<AgeGroup>,
    pub interaction_test: &'a InteractionTest,
}

impl<'a> RunAudit<'a> {
    /// Collect the audit of an analysis
    #[must_use]
    pub fn new(results: &'a AnalysisResults, config: &'a PipelineConfig) -> Self {
        let failures = results
            .models
            .outcomes()
            .filter_map(ModelOutcome::failure)
            .map(|f| FailureEntry {
                model: f.model.clone(),
                stratum: f.stratum,
                n_effective: f.n_effective,
                reason: f.cause.to_string(),
            })
            .collect();

        Self {
            source: &results.source,
            derivation_settings: &config.derivation,
            model_settings: &config.model,
            derivation: &results.derivation,
            cohort: &results.cohort,
            age_group_counts: results.dataset.age_group_counts(),
            models: ModelStageSummary::from(&results.models),
            failures,
            small_sample_strata: results
                .models
                .stratified
                .iter()
                .filter(|s| s.small_sample)
                .map(|s| s.age_group)
                .collect(),
            interaction_test: &results.models.interaction,
        }
    }
}

/// Coefficient rows of every converged model, in reporting order
#[must_use]
pub fn model_result_rows(results: &AnalysisResults) -> Vec<ModelResultRow> {
    results
        .models
        .outcomes()
        .filter_map(ModelOutcome::fitted)
        .flat_map(|model| {
            model.coefficients.iter().map(move |c| ModelResultRow {
                model_name: model.model_name.clone(),
                predictor: c.predictor.clone(),
                coefficient: c.coefficient,
                std_error: c.std_error,
                odds_ratio: c.odds_ratio,
                ci_low: c.ci_low,
                ci_high: c.ci_high,
                p_value: c.p_value,
                pseudo_r2: model.pseudo_r2,
                n_effective: model.n_effective as u64,
            })
        })
        .collect()
}

/// Summary rows of every attempted model, in reporting order
#[must_use]
pub fn model_summary_rows(results: &AnalysisResults) -> Vec<ModelSummaryRow> {
    let base = results
        .models
        .base
        .iter()
        .map(|o| ModelSummaryRow::new(o, None, false));
    let stratified = results
        .models
        .stratified
        .iter()
        .map(|s| ModelSummaryRow::new(&s.outcome, Some(s.stratum_size), s.small_sample));
    base.chain(stratified).collect()
}

/// Convert typed rows into a record batch
pub fn rows_to_batch<T>(rows: &[T]) -> Result<RecordBatch>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let fields = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())?;
    Ok(serde_arrow::to_record_batch(&fields, &rows)?)
}

/// Write a record batch as a Parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = safe_create_file(path, "writing a Parquet table")?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Write a record batch as a CSV file with a header row
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = safe_create_file(path, "writing a CSV table")?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}

/// Writes the artifacts of a run into one directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    /// Create the writer, creating the directory if needed
    pub fn new(output_dir: &Path) -> Result<Self> {
        ensure_directory(output_dir, "creating the output directory")?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Directory receiving the artifacts
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every artifact; returns their paths in write order
    pub fn write_all(
        &self,
        results: &AnalysisResults,
        config: &PipelineConfig,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        written.extend(self.write_analytic_dataset(results)?);
        written.push(self.write_model_results(results)?);
        written.push(self.write_model_summary(results)?);
        written.extend(self.write_descriptives(results)?);
        written.push(self.write_audit(results, config)?);
        Ok(written)
    }

    /// Analytic dataset as Parquet and CSV
    pub fn write_analytic_dataset(&self, results: &AnalysisResults) -> Result<Vec<PathBuf>> {
        let rows: Vec<AnalyticRow> = results
            .dataset
            .records()
            .iter()
            .map(AnalyticRow::from)
            .collect();
        let batch = rows_to_batch(&rows)?;

        let parquet_path = self.output_dir.join(ANALYTIC_PARQUET);
        write_parquet(&parquet_path, &batch)?;
        let csv_path = self.output_dir.join(ANALYTIC_CSV);
        write_csv(&csv_path, &batch)?;
        debug!("Wrote {} analytic records", rows.len());

        Ok(vec![parquet_path, csv_path])
    }

    /// Coefficient table of the converged models
    pub fn write_model_results(&self, results: &AnalysisResults) -> Result<PathBuf> {
        let path = self.output_dir.join(MODEL_RESULTS_CSV);
        write_csv(&path, &rows_to_batch(&model_result_rows(results))?)?;
        Ok(path)
    }

    /// One line per attempted model
    pub fn write_model_summary(&self, results: &AnalysisResults) -> Result<PathBuf> {
        let path = self.output_dir.join(MODEL_SUMMARY_CSV);
        write_csv(&path, &rows_to_batch(&model_summary_rows(results))?)?;
        Ok(path)
    }

    /// Cross-tabulations and their chi-squared tests
    pub fn write_descriptives(&self, results: &AnalysisResults) -> Result<Vec<PathBuf>> {
        let crosstab_rows: Vec<CrosstabRow> = results
            .descriptives
            .crosstabs
            .iter()
            .flat_map(|t| t.rows.iter().chain(std::iter::once(&t.total)).cloned())
            .collect();
        let crosstab_path = self.output_dir.join(CROSSTABS_CSV);
        write_csv(&crosstab_path, &rows_to_batch(&crosstab_rows)?)?;

        let tests: &[ChiSquareTest] = &results.descriptives.tests;
        let tests_path = self.output_dir.join(ASSOCIATION_TESTS_CSV);
        write_csv(&tests_path, &rows_to_batch(tests)?)?;

        Ok(vec![crosstab_path, tests_path])
    }

    /// Run audit as pretty-printed JSON
    pub fn write_audit(
        &self,
        results: &AnalysisResults,
        config: &PipelineConfig,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(RUN_AUDIT_JSON);
        let mut file = safe_create_file(&path, "writing the run audit")?;
        serde_json::to_writer_pretty(&mut file, &RunAudit::new(results, config))?;
        file.write_all(b"\n")
            .map_err(|e| crate::error::AnalysisError::io_at(&path, e))?;
        Ok(path)
    }
}
