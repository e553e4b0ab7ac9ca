//! Logistic regression models for the condom-use outcome
//!
//! - [`design`]: model specifications and design matrices
//! - [`logistic`]: the Newton-Raphson estimator
//! - [`fitter`]: runs the base models, the interaction test and the
//!   age-stratified family
//! - [`result`]: coefficient tables, fit statistics and likelihood-ratio tests

pub mod design;
pub mod distributions;
pub mod fitter;
pub mod linalg;
pub mod logistic;
pub mod result;

pub use design::{DesignMatrix, INTERCEPT, ModelSpecification, Term, Variable};
pub use fitter::{ModelBatch, ModelFitter, ModelStageSummary, StratifiedOutcome, interaction_test};
pub use logistic::{LogisticRegression, ModelEstimator};
pub use result::{
    CoefficientEstimate, InteractionTest, LikelihoodRatioTest, ModelOutcome, ModelResult,
};
