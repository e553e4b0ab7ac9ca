//! Domain models for the survey analysis
//!
//! Raw survey answers as loaded from the source table, and the analytic
//! records derived from them.

pub mod analytic;
pub mod categories;
pub mod survey;

// Re-export commonly used types
pub use analytic::{AnalyticDataset, AnalyticRecord};
pub use categories::{AgeGroup, CondomUseFrequency};
pub use survey::{RawRecord, RawSurvey};
