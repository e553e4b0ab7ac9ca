//! Mapping between the source table and the survey codebook.
//!
//! The loader resolves every codebook field to a column position once per
//! source. Required fields that cannot be found abort the load with a
//! schema error; optional fields that are absent only produce a warning and
//! null values downstream.

pub mod codebook;

use arrow_schema::Schema;
use log::warn;
use rustc_hash::FxHashMap;

use crate::error::{AnalysisError, Result};
use codebook::{
    AGE, AGE_GROUP, CONDOM_USE, FOLIO, GENDER, HIV_DIAGNOSIS, KNOWLEDGE_ITEMS, NO_TEST_REASON,
    PARTNERS, PREP_AWARENESS, STI_DIAGNOSIS_PREFIX, STI_SUMMARY, TEST_REASON, TESTED_HIV,
};

/// Column positions of the codebook fields in one source table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyColumns {
    /// `folio`
    pub folio: Option<usize>,
    /// `p3`
    pub gender: Option<usize>,
    /// `p4`
    pub age: Option<usize>,
    /// `edad_grupo`
    pub age_group_code: Option<usize>,
    /// `p71` (required)
    pub partners: usize,
    /// `p73` (required)
    pub condom_use: usize,
    /// `i_1_p212` .. `i_6_p212`
    pub knowledge_items: [Option<usize>; 6],
    /// `its_alguna_vez`
    pub sti_summary: Option<usize>,
    /// Every `p202_*` column, as (name, position) in source order
    pub sti_diagnoses: Vec<(String, usize)>,
    /// `p202_vih`
    pub hiv_diagnosis: Option<usize>,
    /// `p208`
    pub tested_hiv: Option<usize>,
    /// `p210`
    pub test_reason: Option<usize>,
    /// `p211`
    pub no_test_reason: Option<usize>,
    /// `p213`
    pub prep_awareness: Option<usize>,
}

impl SurveyColumns {
    /// Resolve codebook fields against a source schema
    ///
    /// Names are matched exactly first and case-insensitively second, since
    /// some exports upper-case the field codes.
    ///
    /// # Errors
    /// Returns [`AnalysisError::SchemaError`] listing every required field
    /// that is missing: `p71`, `p73`, and one of `p4` / `edad_grupo`.
    pub fn resolve(schema: &Schema) -> Result<Self> {
        let mut lookup: FxHashMap<String, usize> = FxHashMap::default();
        for (idx, field) in schema.fields().iter().enumerate() {
            lookup.entry(field.name().to_lowercase()).or_insert(idx);
        }
        let find = |name: &str| -> Option<usize> {
            schema
                .index_of(name)
                .ok()
                .or_else(|| lookup.get(&name.to_lowercase()).copied())
        };

        let partners = find(PARTNERS);
        let condom_use = find(CONDOM_USE);
        let age = find(AGE);
        let age_group_code = find(AGE_GROUP);

        let mut missing = Vec::new();
        if partners.is_none() {
            missing.push(PARTNERS.to_string());
        }
        if condom_use.is_none() {
            missing.push(CONDOM_USE.to_string());
        }
        if age.is_none() && age_group_code.is_none() {
            missing.push(format!("{AGE} or {AGE_GROUP}"));
        }
        let (Some(partners), Some(condom_use)) = (partners, condom_use) else {
            return Err(AnalysisError::SchemaError { missing });
        };
        if !missing.is_empty() {
            return Err(AnalysisError::SchemaError { missing });
        }

        let mut knowledge_items = [None; 6];
        for (slot, item) in knowledge_items.iter_mut().zip(KNOWLEDGE_ITEMS.iter()) {
            *slot = find(item.field);
        }

        let sti_diagnoses = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name().to_lowercase().starts_with(STI_DIAGNOSIS_PREFIX))
            .map(|(idx, f)| (f.name().clone(), idx))
            .collect();

        Ok(Self {
            folio: find(FOLIO),
            gender: find(GENDER),
            age,
            age_group_code,
            partners,
            condom_use,
            knowledge_items,
            sti_summary: find(STI_SUMMARY),
            sti_diagnoses,
            hiv_diagnosis: find(HIV_DIAGNOSIS),
            tested_hiv: find(TESTED_HIV),
            test_reason: find(TEST_REASON),
            no_test_reason: find(NO_TEST_REASON),
            prep_awareness: find(PREP_AWARENESS),
        })
    }

    /// Optional codebook fields that the source does not carry
    #[must_use]
    pub fn absent_optional_fields(&self) -> Vec<String> {
        let mut absent: Vec<String> = [
            (FOLIO, self.folio),
            (GENDER, self.gender),
            (STI_SUMMARY, self.sti_summary),
            (HIV_DIAGNOSIS, self.hiv_diagnosis),
            (TESTED_HIV, self.tested_hiv),
            (TEST_REASON, self.test_reason),
            (NO_TEST_REASON, self.no_test_reason),
            (PREP_AWARENESS, self.prep_awareness),
        ]
        .iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| (*name).to_string())
        .collect();

        absent.extend(
            KNOWLEDGE_ITEMS
                .iter()
                .zip(self.knowledge_items.iter())
                .filter(|(_, idx)| idx.is_none())
                .map(|(item, _)| item.field.to_string()),
        );

        if self.sti_diagnoses.is_empty() {
            absent.push(format!("{STI_DIAGNOSIS_PREFIX}*"));
        }
        absent
    }

    /// Log a warning for each absent optional field
    pub fn warn_absent(&self, source: &str) {
        for field in self.absent_optional_fields() {
            warn!("Field {field} not found in {source}; derived values will be null");
        }
    }
}
