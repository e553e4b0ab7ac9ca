//! Fitted model results and likelihood-ratio tests

use serde::Serialize;

use super::design::INTERCEPT;
use super::distributions::chi_squared_sf;
use crate::error::ConvergenceFailure;
use crate::models::AgeGroup;

/// One coefficient row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientEstimate {
    /// Term label, `Intercept` for the constant
    pub predictor: String,
    /// Estimate on the log-odds scale
    pub coefficient: f64,
    /// Standard error from the inverse observed information
    pub std_error: f64,
    /// Wald statistic
    pub z_value: f64,
    /// `exp(coefficient)`
    pub odds_ratio: f64,
    /// Lower confidence bound on the odds-ratio scale
    pub ci_low: f64,
    /// Upper confidence bound on the odds-ratio scale
    pub ci_high: f64,
    /// Two-sided Wald p-value
    pub p_value: f64,
}

/// A converged logistic model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    /// Model name
    pub model_name: String,
    /// Age group for stratified fits
    pub stratum: Option<AgeGroup>,
    /// Coefficients, intercept first, then terms in specification order
    pub coefficients: Vec<CoefficientEstimate>,
    /// Terms removed before fitting as collinear or constant
    pub dropped_predictors: Vec<String>,
    /// Maximised log-likelihood
    pub log_likelihood: f64,
    /// Log-likelihood of the intercept-only model on the same observations
    pub null_log_likelihood: f64,
    /// McFadden pseudo R²
    pub pseudo_r2: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Observations used
    pub n_effective: usize,
    /// Records excluded by listwise deletion
    pub rows_dropped: usize,
    /// Newton iterations to convergence
    pub iterations: usize,
    /// Confidence level of the intervals
    pub confidence_level: f64,
}

impl ModelResult {
    /// Coefficient row by term label
    #[must_use]
    pub fn coefficient(&self, predictor: &str) -> Option<&CoefficientEstimate> {
        self.coefficients.iter().find(|c| c.predictor == predictor)
    }

    /// Estimated parameters, intercept included
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.coefficients.len()
    }

    /// Labels of the estimated terms other than the intercept
    #[must_use]
    pub fn estimable_predictors(&self) -> Vec<&str> {
        self.coefficients
            .iter()
            .map(|c| c.predictor.as_str())
            .filter(|p| *p != INTERCEPT)
            .collect()
    }
}

/// Result of attempting one model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// The fit converged
    Fitted(ModelResult),
    /// The fit failed; the rest of the run is unaffected
    Failed(ConvergenceFailure),
}

impl ModelOutcome {
    /// Model name
    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::Fitted(r) => &r.model_name,
            Self::Failed(f) => &f.model,
        }
    }

    /// Age group for stratified fits
    #[must_use]
    pub fn stratum(&self) -> Option<AgeGroup> {
        match self {
            Self::Fitted(r) => r.stratum,
            Self::Failed(f) => f.stratum,
        }
    }

    /// Observations available to the fit
    #[must_use]
    pub fn n_effective(&self) -> usize {
        match self {
            Self::Fitted(r) => r.n_effective,
            Self::Failed(f) => f.n_effective,
        }
    }

    /// The result, if the fit converged
    #[must_use]
    pub fn fitted(&self) -> Option<&ModelResult> {
        match self {
            Self::Fitted(r) => Some(r),
            Self::Failed(_) => None,
        }
    }

    /// The failure, if the fit did not converge
    #[must_use]
    pub fn failure(&self) -> Option<&ConvergenceFailure> {
        match self {
            Self::Fitted(_) => None,
            Self::Failed(f) => Some(f),
        }
    }

    /// Whether the fit converged
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted(_))
    }
}

/// Likelihood-ratio test of a full model against a nested reduced model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikelihoodRatioTest {
    /// Reduced model name
    pub reduced_model: String,
    /// Full model name
    pub full_model: String,
    /// `2 (ll_full - ll_reduced)`, floored at zero
    pub statistic: f64,
    /// Difference in estimated parameters
    pub degrees_of_freedom: usize,
    /// Upper chi-squared tail probability
    pub p_value: f64,
    /// Observations shared by both fits
    pub n_effective: usize,
}

impl LikelihoodRatioTest {
    /// Compare two converged fits
    ///
    /// Returns a reason when the test is not defined: the fits used different
    /// observations, or the full model has no extra estimated parameters.
    pub fn compare(reduced: &ModelResult, full: &ModelResult) -> Result<Self, String> {
        if reduced.n_effective != full.n_effective {
            return Err(format!(
                "{} used {} observations but {} used {}",
                reduced.model_name, reduced.n_effective, full.model_name, full.n_effective
            ));
        }

        let reduced_terms = reduced.estimable_predictors();
        if let Some(missing) = reduced_terms
            .iter()
            .find(|t| full.coefficient(t).is_none())
        {
            return Err(format!(
                "{} is not nested in {}: term {} is not estimated in the full model",
                reduced.model_name, full.model_name, missing
            ));
        }

        let degrees_of_freedom = full
            .parameter_count()
            .checked_sub(reduced.parameter_count())
            .filter(|df| *df > 0)
            .ok_or_else(|| {
                format!(
                    "{} estimates no parameters beyond {}",
                    full.model_name, reduced.model_name
                )
            })?;

        let statistic = (2.0 * (full.log_likelihood - reduced.log_likelihood)).max(0.0);
        Ok(Self {
            reduced_model: reduced.model_name.clone(),
            full_model: full.model_name.clone(),
            statistic,
            degrees_of_freedom,
            p_value: chi_squared_sf(statistic, degrees_of_freedom),
            n_effective: full.n_effective,
        })
    }
}

/// Outcome of the interaction test
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InteractionTest {
    /// Both models converged on the same observations
    Computed(LikelihoodRatioTest),
    /// The test could not be computed
    Unavailable {
        /// Why the test was skipped
        reason: String,
    },
}

impl InteractionTest {
    /// The test, if it was computed
    #[must_use]
    pub fn computed(&self) -> Option<&LikelihoodRatioTest> {
        match self {
            Self::Computed(t) => Some(t),
            Self::Unavailable { .. } => None,
        }
    }
}
