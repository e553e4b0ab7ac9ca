//! Configuration for the survey analysis pipeline.
//!
//! Every field has a default matching the published analysis, so an empty
//! JSON object (or no config file at all) reproduces it.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::util::safe_read_to_string;
use crate::error::{AnalysisError, Result};
use crate::models::AgeGroup;

/// Configuration for a complete pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Primary survey source (Parquet)
    pub primary_source: PathBuf,
    /// Alternate survey source (delimited text), used only if the primary is absent
    pub alternate_source: PathBuf,
    /// Field separator of the alternate source
    pub delimiter: char,
    /// Directory receiving every output artifact
    pub output_dir: PathBuf,
    /// Rules for deriving analytic variables
    pub derivation: DerivationConfig,
    /// Numerical settings for the logistic models
    pub model: ModelFitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_source: PathBuf::from("data/enssex_2024.parquet"),
            alternate_source: PathBuf::from("data/enssex_2024.csv"),
            delimiter: ' ', // The survey's text export is space separated
            output_dir: PathBuf::from("results"),
            derivation: DerivationConfig::default(),
            model: ModelFitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = safe_read_to_string(path, "reading pipeline configuration")?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a runnable analysis
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(AnalysisError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        self.derivation.validate()?;
        self.model.validate()
    }

    /// Delimiter as the byte expected by the CSV reader
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Primary Source: {}", self.primary_source.display())?;
        writeln!(f, "  Alternate Source: {}", self.alternate_source.display())?;
        writeln!(f, "  Delimiter: {:?}", self.delimiter)?;
        writeln!(f, "  Output Directory: {}", self.output_dir.display())?;
        writeln!(f, "  Partner Cap: {}", self.derivation.partner_cap)?;
        writeln!(f, "  Minimum Age: {}", self.derivation.minimum_age)?;
        writeln!(f, "  Max Iterations: {}", self.model.max_iterations)?;
        writeln!(f, "  Tolerance: {:e}", self.model.tolerance)?;
        writeln!(f, "  Confidence Level: {}", self.model.confidence_level)?;
        writeln!(f, "  Parallel Fits: {}", self.model.parallel)?;
        Ok(())
    }
}

/// Rules applied by the variable constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// Partner counts above this value are clamped to it
    pub partner_cap: u32,
    /// Partner-count codes meaning "no answer"
    pub partner_missing_codes: Vec<i64>,
    /// Generic non-response codes for categorical items
    pub nonresponse_codes: Vec<i64>,
    /// Codes for an explicit refusal; a knowledge item with one counts as unanswered
    pub refusal_codes: Vec<i64>,
    /// Respondents younger than this have no age group
    pub minimum_age: f64,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            // Suppresses outlier influence
            partner_cap: 100,
            // Codebook sentinel for p71
            partner_missing_codes: vec![999],
            // "Don't know" / "No answer"
            nonresponse_codes: vec![9, 99],
            refusal_codes: vec![99],
            minimum_age: AgeGroup::MIN_AGE,
        }
    }
}

impl DerivationConfig {
    /// Check the derivation rules are usable
    pub fn validate(&self) -> Result<()> {
        if self.partner_cap < 2 {
            return Err(AnalysisError::Config(format!(
                "partner_cap must be at least 2 to separate multiple partners, got {}",
                self.partner_cap
            )));
        }
        if !self.minimum_age.is_finite() || self.minimum_age < AgeGroup::MIN_AGE {
            return Err(AnalysisError::Config(format!(
                "minimum_age must be at least {}, the lower edge of the youngest age group, got {}",
                AgeGroup::MIN_AGE,
                self.minimum_age
            )));
        }
        Ok(())
    }

    /// Whether a raw categorical code means "no answer"
    #[must_use]
    pub fn is_nonresponse(&self, code: f64) -> bool {
        self.nonresponse_codes.iter().any(|&c| c as f64 == code)
    }

    /// Whether a raw code is an explicit refusal to answer
    #[must_use]
    pub fn is_refusal(&self, code: f64) -> bool {
        self.refusal_codes.iter().any(|&c| c as f64 == code)
    }
}

/// Numerical settings for maximum-likelihood fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFitConfig {
    /// Newton iterations before giving up
    pub max_iterations: usize,
    /// Convergence threshold on the largest absolute coefficient change
    pub tolerance: f64,
    /// Relative residual norm below which a predictor counts as collinear
    pub collinearity_tolerance: f64,
    /// Fitted probabilities this close to every outcome signal separation
    pub separation_tolerance: f64,
    /// Coverage of the Wald confidence intervals
    pub confidence_level: f64,
    /// Strata smaller than this are fitted but flagged as small
    pub min_stratum_size: usize,
    /// Fit independent models on a thread pool
    pub parallel: bool,
    /// Size of the thread pool (defaults to the number of CPUs)
    pub threads: Option<usize>,
    /// Show a progress bar while fitting
    pub show_progress: bool,
}

impl Default for ModelFitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-8,
            collinearity_tolerance: 1e-9,
            separation_tolerance: 1e-6,
            confidence_level: 0.95,
            min_stratum_size: 30, // Smallest stratum reported in the paper
            parallel: true,
            threads: None,
            show_progress: false,
        }
    }
}

impl ModelFitConfig {
    /// Check the numerical settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AnalysisError::Config(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(AnalysisError::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(AnalysisError::Config(format!(
                "confidence_level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.threads == Some(0) {
            return Err(AnalysisError::Config("threads must be positive".to_string()));
        }
        Ok(())
    }

    /// Number of worker threads used for parallel fits
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }
}
