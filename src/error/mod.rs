//! Error handling for the survey analysis pipeline.
//!
//! Stage-level problems (no source file, missing codebook columns, IO while
//! writing results) are returned as [`AnalysisError`] and abort the stage.
//! Field-level problems never reach this module: they become `None` in the
//! derived record. Model-level problems are recorded as [`ConvergenceFailure`]
//! values next to the successful fits so sibling models keep running.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::models::AgeGroup;

/// Specialized error type for the analysis pipeline
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Neither the primary nor the alternate source file exists
    #[error(
        "no survey source available (primary: {}, alternate: {})",
        .primary.display(),
        .alternate.display()
    )]
    SourceUnavailable {
        /// Primary (Parquet) source that was looked for
        primary: PathBuf,
        /// Alternate (delimited text) source that was looked for
        alternate: PathBuf,
    },

    /// Required field codes are missing from the source table
    #[error("source is missing required field codes: {}", .missing.join(", "))]
    SchemaError {
        /// Codebook fields that could not be found
        missing: Vec<String>,
    },

    /// Invalid pipeline configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Error opening, reading or writing a file
    #[error("IO error{}: {source}", .path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    Io {
        /// File the operation was performed on, when known
        path: Option<PathBuf>,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error processing Arrow data (CSV reading and writing included)
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error converting typed rows to record batches
    #[error("Serialization error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error reading configuration or writing the audit report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<io::Error> for AnalysisError {
    fn from(source: io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

impl AnalysisError {
    /// Wrap an IO error together with the file it concerns
    pub fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }
}

/// Numeric reason a logistic fit could not produce stable estimates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// Every usable row has the same outcome value
    #[error("outcome has no variation ({positives} of {n} positive)")]
    NoOutcomeVariation {
        /// Number of rows with outcome 1
        positives: usize,
        /// Number of usable rows
        n: usize,
    },

    /// Fewer complete rows than parameters to estimate
    #[error("{n} complete rows for {parameters} parameters")]
    InsufficientObservations {
        /// Number of usable rows
        n: usize,
        /// Number of estimable parameters
        parameters: usize,
    },

    /// The predictors separate the outcome completely or quasi-completely
    #[error("perfect separation detected at iteration {iteration}")]
    PerfectSeparation {
        /// Newton iteration at which separation was detected
        iteration: usize,
    },

    /// The Fisher information matrix is not positive definite
    #[error("singular information matrix at iteration {iteration}")]
    SingularInformation {
        /// Newton iteration at which the factorisation failed
        iteration: usize,
    },

    /// Coefficients or log-likelihood became non-finite
    #[error("non-finite estimates at iteration {iteration}")]
    NonFinite {
        /// Newton iteration at which the estimates diverged
        iteration: usize,
    },

    /// Coefficient changes never fell below the tolerance
    #[error("no convergence after {max_iterations} iterations")]
    IterationLimit {
        /// Configured iteration limit
        max_iterations: usize,
    },
}

/// A model specification whose fit failed, with the stratum it belongs to
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("model `{model}`{} failed to converge: {cause}", .stratum.map(|g| format!(" (age {g})")).unwrap_or_default())]
pub struct ConvergenceFailure {
    /// Name of the model specification
    pub model: String,
    /// Age stratum for stratified specifications
    pub stratum: Option<AgeGroup>,
    /// Complete rows available to the fit
    pub n_effective: usize,
    /// Numeric cause of the failure
    pub cause: FitError,
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
