//! Inclusion criteria for the analytic cohort

use serde::Serialize;

use crate::models::AnalyticRecord;

/// Defines a criterion for filtering records
pub trait FilterCriteria<T> {
    /// Determine if an entity meets the filter criteria
    fn meets_criteria(&self, entity: &T) -> bool;
}

/// Why a respondent was left out of the cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No partner in the last year, or partner count not answered
    NoRecentPartners,
    /// Condom-use frequency missing or outside the three valid codes
    MissingCondomUse,
    /// Age missing or below the minimum age
    MissingAgeGroup,
}

impl ExclusionReason {
    /// Description used in the cohort flow summary
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NoRecentPartners => "no sexual partners in last year (p71 = 0 or missing)",
            Self::MissingCondomUse => "missing condom use data (p73)",
            Self::MissingAgeGroup => "missing or out-of-range age",
        }
    }
}

/// A single inclusion rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortCriterion {
    /// At least one partner in the last year, judged on the reported count
    SexuallyActive,
    /// A valid condom-use code
    ValidCondomUse,
    /// A valid age group
    ValidAgeGroup,
}

impl CohortCriterion {
    /// Exclusion recorded when this criterion fails
    #[must_use]
    pub const fn exclusion_reason(self) -> ExclusionReason {
        match self {
            Self::SexuallyActive => ExclusionReason::NoRecentPartners,
            Self::ValidCondomUse => ExclusionReason::MissingCondomUse,
            Self::ValidAgeGroup => ExclusionReason::MissingAgeGroup,
        }
    }
}

impl FilterCriteria<AnalyticRecord> for CohortCriterion {
    fn meets_criteria(&self, record: &AnalyticRecord) -> bool {
        match self {
            // Pre-cap value: clamping never turns an inactive respondent active
            Self::SexuallyActive => record.partners_reported.is_some_and(|n| n >= 1),
            Self::ValidCondomUse => record.condom_use_freq.is_some(),
            Self::ValidAgeGroup => record.age_group.is_some(),
        }
    }
}
