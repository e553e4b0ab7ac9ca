//! Correlates of consistent condom use in the ENSSEX survey.
//!
//! The crate loads a survey export, derives analytic variables, selects the
//! sexually active cohort and fits a family of logistic regression models of
//! "always uses a condom" on age, HIV knowledge, partners, STI history,
//! testing and PrEP awareness.
//!
//! The stages are available individually or through [`Pipeline`]:
//!
//! - [`loader`]: Parquet or delimited-text survey sources
//! - [`algorithm::variables`]: the Variable Constructor
//! - [`algorithm::cohort`]: the Cohort Filter
//! - [`algorithm::regression`]: the Model Fitter
//! - [`report`]: result tables and the run audit

pub mod algorithm;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod synthetic;
pub mod utils;

// Core types
pub use config::{DerivationConfig, ModelFitConfig, PipelineConfig};
pub use error::{AnalysisError, ConvergenceFailure, FitError, Result};
pub use models::{
    AgeGroup, AnalyticDataset, AnalyticRecord, CondomUseFrequency, RawRecord, RawSurvey,
};

// Stages
pub use algorithm::cohort::{CohortAudit, CohortFilter};
pub use algorithm::regression::{
    InteractionTest, LikelihoodRatioTest, LogisticRegression, ModelBatch, ModelEstimator,
    ModelFitter, ModelOutcome, ModelResult, ModelSpecification,
};
pub use algorithm::statistics::{DescriptiveReport, DescriptiveStatistics};
pub use algorithm::variables::{DerivationAudit, VariableConstructor};
pub use loader::{DelimitedSource, ParquetSource, RecordSource, load_survey, resolve_source};
pub use pipeline::{AnalysisResults, Pipeline, PipelineReport};
pub use synthetic::SyntheticSurvey;

// Arrow types
pub use arrow::record_batch::RecordBatch;
