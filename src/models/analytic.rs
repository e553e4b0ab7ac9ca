//! Analytic records and the analytic dataset
//!
//! Every derived variable is optional: a `None` stands for insufficient data
//! in the raw answers. The [`AnalyticDataset`] can only be produced by the
//! cohort filter, so every record it holds has a condom-use answer, an age
//! group and at least one partner in the last year.

use std::collections::BTreeMap;

use super::categories::{AgeGroup, CondomUseFrequency};

/// Variables derived for one respondent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticRecord {
    /// Position of the respondent in the source table
    pub row: usize,
    /// Respondent identifier
    pub folio: Option<String>,
    /// Gender code, passed through unchanged
    pub gender: Option<i64>,
    /// Age in years
    pub age_years: Option<f64>,
    /// Ordinal age group
    pub age_group: Option<AgeGroup>,
    /// Corrected HIV knowledge score, 0..=6
    pub hiv_knowledge_score: Option<u8>,
    /// Knowledge items with any answer recorded
    pub knowledge_items_answered: u8,
    /// Condom-use frequency
    pub condom_use_freq: Option<CondomUseFrequency>,
    /// Condom used every time
    pub always_condom: Option<bool>,
    /// Condom used at least sometimes
    pub ever_condom: Option<bool>,
    /// Partner count as reported, before capping
    pub partners_reported: Option<u32>,
    /// Partner count after capping
    pub partners_last_year: Option<u32>,
    /// Whether the reported partner count exceeded the cap
    pub partners_capped: bool,
    /// Two or more partners in the last year
    pub multiple_partners: Option<bool>,
    /// Any lifetime STI diagnosis
    pub any_sti: Option<bool>,
    /// Lifetime HIV diagnosis
    pub hiv_diagnosis: Option<bool>,
    /// Tested for HIV in the last 12 months
    pub tested_hiv_12mo: Option<bool>,
    /// Reason for the last HIV test (raw reason code)
    pub test_reason: Option<i64>,
    /// Reason for never testing (raw reason code)
    pub no_test_reason: Option<i64>,
    /// Heard of PrEP
    pub knows_prep: Option<bool>,
}

/// The cohort of respondents eligible for the analysis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticDataset {
    records: Vec<AnalyticRecord>,
}

impl AnalyticDataset {
    /// Wrap records that already passed the cohort filter
    pub(crate) fn from_filtered(records: Vec<AnalyticRecord>) -> Self {
        Self { records }
    }

    /// Records in source order
    #[must_use]
    pub fn records(&self) -> &[AnalyticRecord] {
        &self.records
    }

    /// Give the records back, e.g. to re-apply a filter
    #[must_use]
    pub fn into_records(self) -> Vec<AnalyticRecord> {
        self.records
    }

    /// Number of respondents in the cohort
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cohort is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of a single age group, in source order
    #[must_use]
    pub fn age_stratum(&self, group: AgeGroup) -> Vec<AnalyticRecord> {
        self.records
            .iter()
            .filter(|r| r.age_group == Some(group))
            .cloned()
            .collect()
    }

    /// Count of respondents per age group (every group present, possibly 0)
    #[must_use]
    pub fn age_group_counts(&self) -> BTreeMap<AgeGroup, usize> {
        let mut counts: BTreeMap<AgeGroup, usize> =
            AgeGroup::ALL.iter().map(|g| (*g, 0)).collect();
        for group in self.records.iter().filter_map(|r| r.age_group) {
            *counts.entry(group).or_insert(0) += 1;
        }
        counts
    }
}
