//! Maximum-likelihood logistic regression
//!
//! Newton-Raphson on the Bernoulli log-likelihood with step halving,
//! starting from all-zero coefficients. Constant and collinear terms are
//! screened out before the first iteration and reported as dropped.

use log::{debug, warn};

use super::design::{DesignMatrix, ModelSpecification};
use super::distributions::{normal_quantile, two_sided_normal_p};
use super::linalg::{Cholesky, SquareMatrix, independent_columns};
use super::result::{CoefficientEstimate, ModelOutcome, ModelResult};
use crate::config::ModelFitConfig;
use crate::error::{ConvergenceFailure, FitError};
use crate::models::AnalyticRecord;

/// Fits a model specification to a set of records
pub trait ModelEstimator: Send + Sync {
    /// Fit the specification; failures are returned as values, never raised
    fn fit(&self, spec: &ModelSpecification, records: &[AnalyticRecord]) -> ModelOutcome;
}

/// Converged Newton iterate
#[derive(Debug, Clone)]
struct NewtonFit {
    coefficients: Vec<f64>,
    covariance: SquareMatrix,
    log_likelihood: f64,
    iterations: usize,
}

const MAX_STEP_HALVINGS: usize = 30;

/// Linear predictors beyond this put fitted probabilities within e^-30 of 0 or 1
const SEPARATION_ETA_BOUND: f64 = 30.0;

/// Logistic regression by Newton-Raphson
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    config: ModelFitConfig,
}

impl LogisticRegression {
    /// Create an estimator with the given numerical settings
    #[must_use]
    pub fn new(config: ModelFitConfig) -> Self {
        Self { config }
    }

    /// Numerical settings in use
    #[must_use]
    pub fn config(&self) -> &ModelFitConfig {
        &self.config
    }

    fn fit_design(
        &self,
        spec: &ModelSpecification,
        design: &DesignMatrix,
    ) -> Result<ModelResult, FitError> {
        let n = design.n_observations();
        if n == 0 {
            return Err(FitError::InsufficientObservations {
                n,
                parameters: spec.parameter_count(),
            });
        }

        let positives = design.positives();
        if positives == 0 || positives == n {
            return Err(FitError::NoOutcomeVariation { positives, n });
        }

        let kept = independent_columns(&design.columns, self.config.collinearity_tolerance);
        let dropped_predictors: Vec<String> = (0..design.columns.len())
            .filter(|idx| !kept.contains(idx))
            .map(|idx| design.column_names[idx].clone())
            .collect();
        if !dropped_predictors.is_empty() {
            warn!(
                "{}: dropping non-estimable terms {:?}",
                spec.name, dropped_predictors
            );
        }

        let reduced = design.select_columns(&kept);
        let parameters = reduced.columns.len();
        if n <= parameters {
            return Err(FitError::InsufficientObservations { n, parameters });
        }

        let fit = self.newton(&reduced)?;
        Ok(self.summarize(spec, &reduced, fit, dropped_predictors, positives))
    }

    fn newton(&self, design: &DesignMatrix) -> Result<NewtonFit, FitError> {
        let p = design.columns.len();
        let mut beta = vec![0.0; p];
        let mut log_likelihood = log_likelihood_of(design, &beta);

        for iteration in 1..=self.config.max_iterations {
            let (score, information) = score_and_information(design, &beta);
            let step = Cholesky::factorize(&information)
                .ok_or_else(|| singular_or_separated(design, &beta, iteration))?
                .solve(&score);

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_STEP_HALVINGS {
                let candidate: Vec<f64> =
                    beta.iter().zip(&step).map(|(b, s)| b + scale * s).collect();
                let candidate_ll = log_likelihood_of(design, &candidate);
                if candidate_ll.is_finite() && candidate_ll >= log_likelihood {
                    accepted = Some((candidate, candidate_ll));
                    break;
                }
                scale *= 0.5;
            }

            let change = match accepted {
                Some((candidate, candidate_ll)) => {
                    if candidate.iter().any(|b| !b.is_finite()) {
                        return Err(FitError::NonFinite { iteration });
                    }
                    let change = beta
                        .iter()
                        .zip(&candidate)
                        .map(|(old, new)| (new - old).abs())
                        .fold(0.0, f64::max);
                    beta = candidate;
                    log_likelihood = candidate_ll;
                    change
                }
                // No ascent along the Newton direction: already at the optimum
                None => 0.0,
            };

            if max_residual(design, &beta) < self.config.separation_tolerance {
                return Err(FitError::PerfectSeparation { iteration });
            }

            if change < self.config.tolerance {
                if is_quasi_separated(design, &beta) {
                    return Err(FitError::PerfectSeparation { iteration });
                }
                let (_, information) = score_and_information(design, &beta);
                let covariance = Cholesky::factorize(&information)
                    .ok_or_else(|| singular_or_separated(design, &beta, iteration))?
                    .inverse();
                if !covariance.is_finite() || !log_likelihood.is_finite() {
                    return Err(FitError::NonFinite { iteration });
                }
                debug!("Newton converged after {iteration} iterations (ll = {log_likelihood:.6})");
                return Ok(NewtonFit {
                    coefficients: beta,
                    covariance,
                    log_likelihood,
                    iterations: iteration,
                });
            }
        }

        if is_quasi_separated(design, &beta) {
            return Err(FitError::PerfectSeparation {
                iteration: self.config.max_iterations,
            });
        }
        Err(FitError::IterationLimit {
            max_iterations: self.config.max_iterations,
        })
    }

    fn summarize(
        &self,
        spec: &ModelSpecification,
        design: &DesignMatrix,
        fit: NewtonFit,
        dropped_predictors: Vec<String>,
        positives: usize,
    ) -> ModelResult {
        let n = design.n_observations();
        let alpha = 1.0 - self.config.confidence_level;
        let z_critical = normal_quantile(1.0 - alpha / 2.0);

        let coefficients = design
            .column_names
            .iter()
            .zip(&fit.coefficients)
            .zip(fit.covariance.diagonal())
            .map(|((name, &coefficient), variance)| {
                let std_error = variance.sqrt();
                let z_value = coefficient / std_error;
                CoefficientEstimate {
                    predictor: name.clone(),
                    coefficient,
                    std_error,
                    z_value,
                    odds_ratio: coefficient.exp(),
                    ci_low: (coefficient - z_critical * std_error).exp(),
                    ci_high: (coefficient + z_critical * std_error).exp(),
                    p_value: two_sided_normal_p(z_value),
                }
            })
            .collect::<Vec<_>>();

        let null_log_likelihood = null_log_likelihood(positives, n);
        let k = coefficients.len() as f64;
        let ll = fit.log_likelihood;

        ModelResult {
            model_name: spec.name.clone(),
            stratum: spec.stratum,
            coefficients,
            dropped_predictors,
            log_likelihood: ll,
            null_log_likelihood,
            pseudo_r2: 1.0 - ll / null_log_likelihood,
            aic: -2.0 * ll + 2.0 * k,
            bic: -2.0 * ll + k * (n as f64).ln(),
            n_effective: n,
            rows_dropped: design.rows_dropped,
            iterations: fit.iterations,
            confidence_level: self.config.confidence_level,
        }
    }
}

impl ModelEstimator for LogisticRegression {
    fn fit(&self, spec: &ModelSpecification, records: &[AnalyticRecord]) -> ModelOutcome {
        let design = DesignMatrix::build(spec, records);
        let n_effective = design.n_observations();
        debug!(
            "{}: {} complete rows, {} dropped by listwise deletion",
            spec.name, n_effective, design.rows_dropped
        );

        match self.fit_design(spec, &design) {
            Ok(result) => ModelOutcome::Fitted(result),
            Err(cause) => {
                let failure = ConvergenceFailure {
                    model: spec.name.clone(),
                    stratum: spec.stratum,
                    n_effective,
                    cause,
                };
                warn!("{failure}");
                ModelOutcome::Failed(failure)
            }
        }
    }
}

fn linear_predictor(design: &DesignMatrix, beta: &[f64]) -> Vec<f64> {
    let mut eta = vec![0.0; design.n_observations()];
    for (column, b) in design.columns.iter().zip(beta) {
        for (e, x) in eta.iter_mut().zip(column) {
            *e += b * x;
        }
    }
    eta
}

/// Logistic function, stable for large |eta|
fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^eta)` without overflow
fn softplus(eta: f64) -> f64 {
    if eta > 0.0 {
        eta + (-eta).exp().ln_1p()
    } else {
        eta.exp().ln_1p()
    }
}

fn log_likelihood_of(design: &DesignMatrix, beta: &[f64]) -> f64 {
    linear_predictor(design, beta)
        .iter()
        .zip(&design.outcome)
        .map(|(eta, y)| y * eta - softplus(*eta))
        .sum()
}

/// Gradient `Xᵀ(y - p)` and observed information `Xᵀ W X`
fn score_and_information(design: &DesignMatrix, beta: &[f64]) -> (Vec<f64>, SquareMatrix) {
    let p = design.columns.len();
    let probabilities: Vec<f64> = linear_predictor(design, beta)
        .into_iter()
        .map(sigmoid)
        .collect();
    let weights: Vec<f64> = probabilities.iter().map(|pi| pi * (1.0 - pi)).collect();

    let score = design
        .columns
        .iter()
        .map(|column| {
            column
                .iter()
                .zip(&design.outcome)
                .zip(&probabilities)
                .map(|((x, y), pi)| x * (y - pi))
                .sum::<f64>()
        })
        .collect();

    let mut information = SquareMatrix::zeros(p);
    for j in 0..p {
        for k in j..p {
            let value: f64 = design.columns[j]
                .iter()
                .zip(&design.columns[k])
                .zip(&weights)
                .map(|((xj, xk), w)| xj * xk * w)
                .sum();
            information.set(j, k, value);
            information.set(k, j, value);
        }
    }

    (score, information)
}

fn max_residual(design: &DesignMatrix, beta: &[f64]) -> f64 {
    linear_predictor(design, beta)
        .into_iter()
        .zip(&design.outcome)
        .map(|(eta, y)| (y - sigmoid(eta)).abs())
        .fold(0.0, f64::max)
}

/// Some fitted probability has been driven to 0 or 1 while others stay
/// interior, the signature of quasi-complete separation
fn is_quasi_separated(design: &DesignMatrix, beta: &[f64]) -> bool {
    linear_predictor(design, beta)
        .iter()
        .any(|eta| eta.abs() > SEPARATION_ETA_BOUND)
}

fn singular_or_separated(design: &DesignMatrix, beta: &[f64], iteration: usize) -> FitError {
    if is_quasi_separated(design, beta) {
        FitError::PerfectSeparation { iteration }
    } else {
        FitError::SingularInformation { iteration }
    }
}

/// Log-likelihood of the intercept-only model
fn null_log_likelihood(positives: usize, n: usize) -> f64 {
    let n1 = positives as f64;
    let n0 = (n - positives) as f64;
    let p = n1 / n as f64;
    n1 * p.ln() + n0 * (1.0 - p).ln()
}
