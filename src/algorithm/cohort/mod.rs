//! Cohort selection
//!
//! Applies the inclusion criteria to the candidate records and produces the
//! [`AnalyticDataset`] together with a [`CohortAudit`] of what was dropped.
//! Retention is a pure conjunction of the criteria; for the audit each
//! dropped respondent is charged to the first failing criterion, in the
//! order the cohort flow diagram lists them.

pub mod filters;

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::models::{AnalyticDataset, AnalyticRecord};
pub use filters::{CohortCriterion, ExclusionReason, FilterCriteria};

/// Counts describing how the cohort was formed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CohortAudit {
    /// Candidate records before filtering
    pub initial: usize,
    /// Records in the analytic dataset
    pub retained: usize,
    /// Records dropped
    pub dropped: usize,
    /// Dropped records by first failing criterion (every reason listed)
    pub dropped_by_reason: BTreeMap<ExclusionReason, usize>,
}

impl CohortAudit {
    /// Render the cohort flow as text
    #[must_use]
    pub fn summary(&self) -> String {
        let pct = |n: usize| {
            if self.initial > 0 {
                100.0 * n as f64 / self.initial as f64
            } else {
                0.0
            }
        };

        let mut summary = String::new();
        summary.push_str("Cohort Flow:\n");
        summary.push_str(&format!("  Initial sample: {}\n", self.initial));

        let mut remaining = self.initial;
        for (reason, count) in &self.dropped_by_reason {
            remaining -= count;
            summary.push_str(&format!(
                "  Excluded, {}: {} -> {} remain ({:.1}%)\n",
                reason.description(),
                count,
                remaining,
                pct(remaining)
            ));
        }

        summary.push_str(&format!(
            "  Final analysis sample: {} ({:.1}%), dropped {}\n",
            self.retained,
            pct(self.retained),
            self.dropped
        ));
        summary
    }
}

/// Filter producing the analytic cohort
#[derive(Debug, Clone)]
pub struct CohortFilter {
    criteria: Vec<CohortCriterion>,
}

impl Default for CohortFilter {
    fn default() -> Self {
        Self {
            criteria: vec![
                CohortCriterion::SexuallyActive,
                CohortCriterion::ValidCondomUse,
                CohortCriterion::ValidAgeGroup,
            ],
        }
    }
}

impl CohortFilter {
    /// Create the standard cohort filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First criterion the record fails, if any
    #[must_use]
    pub fn exclusion_reason(&self, record: &AnalyticRecord) -> Option<ExclusionReason> {
        self.criteria
            .iter()
            .find(|criterion| !criterion.meets_criteria(record))
            .map(|criterion| criterion.exclusion_reason())
    }

    /// Whether the record belongs in the cohort
    #[must_use]
    pub fn is_eligible(&self, record: &AnalyticRecord) -> bool {
        self.criteria.iter().all(|c| c.meets_criteria(record))
    }

    /// Split candidates into the analytic dataset and an audit of the drops
    #[must_use]
    pub fn apply(&self, candidates: Vec<AnalyticRecord>) -> (AnalyticDataset, CohortAudit) {
        let mut audit = CohortAudit {
            initial: candidates.len(),
            dropped_by_reason: self
                .criteria
                .iter()
                .map(|c| (c.exclusion_reason(), 0))
                .collect(),
            ..CohortAudit::default()
        };

        let mut retained = Vec::with_capacity(candidates.len());
        for record in candidates {
            match self.exclusion_reason(&record) {
                None => retained.push(record),
                Some(reason) => *audit.dropped_by_reason.entry(reason).or_insert(0) += 1,
            }
        }

        audit.retained = retained.len();
        audit.dropped = audit.initial - audit.retained;
        info!(
            "Cohort: {} of {} respondents retained, {} dropped",
            audit.retained, audit.initial, audit.dropped
        );

        (AnalyticDataset::from_filtered(retained), audit)
    }
}
