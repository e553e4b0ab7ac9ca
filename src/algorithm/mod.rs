//! Analysis stages
//!
//! Variable construction, cohort selection, descriptive cross-tabulations
//! and the logistic model family.

pub mod cohort;
pub mod regression;
pub mod statistics;
pub mod variables;
