//! Variable construction
//!
//! Pure mapping from one [`RawRecord`] to one candidate [`AnalyticRecord`].
//! A bad or missing field never raises: it becomes `None` in the derived
//! variable and is counted in the [`DerivationAudit`].

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::config::DerivationConfig;
use crate::models::{AgeGroup, AnalyticRecord, CondomUseFrequency, RawRecord, RawSurvey};
use crate::schema::codebook::{KNOWLEDGE_ITEMS, YES};

/// Partner counts derived from `p71`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartnerCount {
    /// Count as reported
    pub reported: Option<u32>,
    /// Count clamped to the cap
    pub capped: Option<u32>,
    /// Whether clamping changed the value
    pub was_capped: bool,
}

/// Null counts per derived variable over a whole survey
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivationAudit {
    /// Respondents processed
    pub respondents: usize,
    /// Respondents whose variable could not be derived, by variable name
    pub null_counts: BTreeMap<String, usize>,
    /// Respondents whose partner count was clamped to the cap
    pub partners_capped: usize,
}

impl DerivationAudit {
    fn new() -> Self {
        let null_counts = DERIVED_VARIABLES
            .iter()
            .map(|name| ((*name).to_string(), 0))
            .collect();
        Self {
            respondents: 0,
            null_counts,
            partners_capped: 0,
        }
    }

    fn record(&mut self, record: &AnalyticRecord) {
        self.respondents += 1;
        if record.partners_capped {
            self.partners_capped += 1;
        }

        let nulls = [
            record.age_group.is_none(),
            record.hiv_knowledge_score.is_none(),
            record.condom_use_freq.is_none(),
            record.partners_last_year.is_none(),
            record.any_sti.is_none(),
            record.hiv_diagnosis.is_none(),
            record.tested_hiv_12mo.is_none(),
            record.test_reason.is_none(),
            record.no_test_reason.is_none(),
            record.knows_prep.is_none(),
        ];
        for (name, is_null) in DERIVED_VARIABLES.iter().zip(nulls) {
            if is_null {
                *self.null_counts.entry((*name).to_string()).or_insert(0) += 1;
            }
        }
    }
}

const DERIVED_VARIABLES: [&str; 10] = [
    "age_group",
    "hiv_knowledge_score",
    "condom_use_freq",
    "partners_last_year",
    "any_sti",
    "hiv_diagnosis",
    "tested_hiv_12mo",
    "test_reason",
    "no_test_reason",
    "knows_prep",
];

/// Derives analytic variables from raw survey answers
#[derive(Debug, Clone, Default)]
pub struct VariableConstructor {
    config: DerivationConfig,
}

impl VariableConstructor {
    /// Create a constructor with the given derivation rules
    #[must_use]
    pub fn new(config: DerivationConfig) -> Self {
        Self { config }
    }

    /// Derive candidate records for every respondent, in source order
    #[must_use]
    pub fn derive_all(&self, survey: &RawSurvey) -> (Vec<AnalyticRecord>, DerivationAudit) {
        let mut audit = DerivationAudit::new();
        let records: Vec<AnalyticRecord> = survey
            .records
            .iter()
            .enumerate()
            .map(|(row, raw)| {
                let record = self.derive(row, raw);
                audit.record(&record);
                record
            })
            .collect();

        info!(
            "Derived variables for {} respondents ({} partner counts capped at {})",
            audit.respondents, audit.partners_capped, self.config.partner_cap
        );
        (records, audit)
    }

    /// Derive one candidate record
    #[must_use]
    pub fn derive(&self, row: usize, raw: &RawRecord) -> AnalyticRecord {
        let (hiv_knowledge_score, knowledge_items_answered) =
            self.knowledge_score(&raw.knowledge_items);
        let condom_use_freq = raw.condom_use.and_then(CondomUseFrequency::from_code);
        let partners = self.partners(raw.partners);

        AnalyticRecord {
            row,
            folio: raw.folio.clone(),
            gender: raw.gender.and_then(integer_code),
            age_years: raw.age,
            age_group: self.age_group(raw.age, raw.age_group_code),
            hiv_knowledge_score,
            knowledge_items_answered,
            condom_use_freq,
            always_condom: condom_use_freq.map(CondomUseFrequency::is_always),
            ever_condom: condom_use_freq.map(CondomUseFrequency::is_ever),
            partners_reported: partners.reported,
            partners_last_year: partners.capped,
            partners_capped: partners.was_capped,
            multiple_partners: partners.capped.map(|n| n >= 2),
            any_sti: self.any_sti(raw.sti_summary, &raw.sti_diagnoses),
            hiv_diagnosis: self.yes_no(raw.hiv_diagnosis),
            tested_hiv_12mo: self.yes_no(raw.tested_hiv),
            test_reason: self.reason_code(raw.test_reason),
            no_test_reason: self.reason_code(raw.no_test_reason),
            knows_prep: self.yes_no(raw.prep_awareness),
        }
    }

    /// Corrected knowledge score and the number of answered items
    ///
    /// Each item scores 1 only when its raw code equals the item's correct
    /// code; "don't know" scores 0. Missing and refused items score 0 and do
    /// not count as answered; if none is answered the score is `None`.
    #[must_use]
    pub fn knowledge_score(&self, items: &[Option<f64>; 6]) -> (Option<u8>, u8) {
        let mut answered = 0u8;
        let mut score = 0u8;
        for (raw, item) in items.iter().zip(KNOWLEDGE_ITEMS.iter()) {
            if let Some(code) = raw.filter(|c| !self.config.is_refusal(*c)) {
                answered += 1;
                if code == item.correct_code {
                    score += 1;
                }
            }
        }

        let score = (answered > 0).then_some(score);
        (score, answered)
    }

    /// Reported and capped partner counts
    #[must_use]
    pub fn partners(&self, raw: Option<f64>) -> PartnerCount {
        let Some(value) = raw else {
            return PartnerCount::default();
        };
        let is_missing_code = self
            .config
            .partner_missing_codes
            .iter()
            .any(|&c| c as f64 == value);
        if is_missing_code || value < 0.0 || value.fract() != 0.0 {
            return PartnerCount::default();
        }

        let reported = if value > f64::from(u32::MAX) {
            u32::MAX
        } else {
            value as u32
        };
        let cap = self.config.partner_cap;
        PartnerCount {
            reported: Some(reported),
            capped: Some(reported.min(cap)),
            was_capped: reported > cap,
        }
    }

    /// Age group from the age in years, falling back to a precomputed code
    #[must_use]
    pub fn age_group(&self, age: Option<f64>, group_code: Option<f64>) -> Option<AgeGroup> {
        match age {
            Some(years) => AgeGroup::from_age(years, self.config.minimum_age),
            None => group_code.and_then(AgeGroup::from_code),
        }
    }

    /// Any STI diagnosis
    ///
    /// An answered summary flag decides on its own. Otherwise the
    /// per-infection items are combined with a logical OR; if none of them
    /// is answered the result is `None`.
    #[must_use]
    pub fn any_sti(&self, summary: Option<f64>, diagnoses: &[Option<f64>]) -> Option<bool> {
        if let Some(flag) = self.answered(summary) {
            return Some(flag == YES);
        }

        let mut any_answered = false;
        for code in diagnoses.iter().filter_map(|d| self.answered(*d)) {
            if code == YES {
                return Some(true);
            }
            any_answered = true;
        }
        any_answered.then_some(false)
    }

    /// Binary item: code 1 is true, any other answer false, non-response `None`
    #[must_use]
    pub fn yes_no(&self, code: Option<f64>) -> Option<bool> {
        self.answered(code).map(|c| c == YES)
    }

    /// Categorical reason code passed through, non-response `None`
    #[must_use]
    pub fn reason_code(&self, code: Option<f64>) -> Option<i64> {
        self.answered(code).and_then(integer_code)
    }

    fn answered(&self, code: Option<f64>) -> Option<f64> {
        code.filter(|c| !self.config.is_nonresponse(*c))
    }
}

fn integer_code(value: f64) -> Option<i64> {
    (value.fract() == 0.0).then_some(value as i64)
}
