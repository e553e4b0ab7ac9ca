//! Survey codebook field codes
//!
//! Column names of the ENSSEX 2024 export used by the analysis, and the
//! correct-answer table for the HIV knowledge block (P212).

/// Respondent identifier
pub const FOLIO: &str = "folio";
/// Gender
pub const GENDER: &str = "p3";
/// Age in years
pub const AGE: &str = "p4";
/// Precomputed age group (1..=7), present in the curated export only
pub const AGE_GROUP: &str = "edad_grupo";
/// Sexual partners in the last year
pub const PARTNERS: &str = "p71";
/// Condom-use frequency in the last year
pub const CONDOM_USE: &str = "p73";
/// Lifetime STI summary flag
pub const STI_SUMMARY: &str = "its_alguna_vez";
/// Prefix shared by the per-infection diagnosis items
pub const STI_DIAGNOSIS_PREFIX: &str = "p202_";
/// HIV diagnosis item
pub const HIV_DIAGNOSIS: &str = "p202_vih";
/// Tested for HIV in the last 12 months
pub const TESTED_HIV: &str = "p208";
/// Reason for the last HIV test
pub const TEST_REASON: &str = "p210";
/// Reason for not testing
pub const NO_TEST_REASON: &str = "p211";
/// PrEP awareness
pub const PREP_AWARENESS: &str = "p213";

/// Answer code for "yes" / "true" / "diagnosed"
pub const YES: f64 = 1.0;
/// Answer code for "no" / "false"
pub const NO: f64 = 2.0;

/// One knowledge item and the code of its correct answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnowledgeItem {
    /// Column name
    pub field: &'static str,
    /// Code that scores one point
    pub correct_code: f64,
}

/// P212 items. Items 1, 2, 3 and 6 are true statements; items 4 and 5 are
/// false statements, so their correct answer is "false" (code 2).
pub const KNOWLEDGE_ITEMS: [KnowledgeItem; 6] = [
    KnowledgeItem { field: "i_1_p212", correct_code: YES },
    KnowledgeItem { field: "i_2_p212", correct_code: YES },
    KnowledgeItem { field: "i_3_p212", correct_code: YES },
    KnowledgeItem { field: "i_4_p212", correct_code: NO },
    KnowledgeItem { field: "i_5_p212", correct_code: NO },
    KnowledgeItem { field: "i_6_p212", correct_code: YES },
];
