//! Raw survey answers
//!
//! One [`RawRecord`] per respondent, holding the codebook fields exactly as
//! they appear in the source table. Codes are kept as `f64` because the two
//! source encodings disagree on integer vs floating-point column types;
//! no recoding happens here.

use smallvec::SmallVec;

use crate::schema::SurveyColumns;

/// A respondent's answers, keyed by codebook field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Respondent identifier (`folio`)
    pub folio: Option<String>,
    /// Gender (`p3`)
    pub gender: Option<f64>,
    /// Age in years (`p4`)
    pub age: Option<f64>,
    /// Precomputed age-group code (`edad_grupo`)
    pub age_group_code: Option<f64>,
    /// Sexual partners in the last year (`p71`)
    pub partners: Option<f64>,
    /// Condom-use frequency code (`p73`)
    pub condom_use: Option<f64>,
    /// HIV knowledge items `i_1_p212` .. `i_6_p212`
    pub knowledge_items: [Option<f64>; 6],
    /// Lifetime STI summary flag (`its_alguna_vez`)
    pub sti_summary: Option<f64>,
    /// Per-infection diagnosis answers (`p202_*`), in source column order
    pub sti_diagnoses: SmallVec<[Option<f64>; 8]>,
    /// HIV diagnosis (`p202_vih`)
    pub hiv_diagnosis: Option<f64>,
    /// Tested for HIV in the last 12 months (`p208`)
    pub tested_hiv: Option<f64>,
    /// Reason for testing (`p210`)
    pub test_reason: Option<f64>,
    /// Reason for not testing (`p211`)
    pub no_test_reason: Option<f64>,
    /// PrEP awareness (`p213`)
    pub prep_awareness: Option<f64>,
}

/// The loaded survey: records plus the columns that were present
#[derive(Debug, Clone)]
pub struct RawSurvey {
    /// Name of the file the records were read from
    pub source: String,
    /// Codebook columns found in the source
    pub columns: SurveyColumns,
    /// One record per source row, in source order
    pub records: Vec<RawRecord>,
}

impl RawSurvey {
    /// Number of respondents
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the survey has no respondents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
