//! Model specifications and design matrices

use std::fmt;

use serde::Serialize;
use smallvec::{SmallVec, smallvec};

use crate::models::{AgeGroup, AnalyticRecord};

/// Name of the intercept row in every result table
pub const INTERCEPT: &str = "Intercept";

/// Analytic variables usable as outcome or predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    /// Ordinal age group code, 1..=7
    AgeGroup,
    /// Corrected HIV knowledge score, 0..=6
    HivKnowledgeScore,
    /// Capped partner count
    PartnersLastYear,
    /// Two or more partners
    MultiplePartners,
    /// Any lifetime STI
    AnySti,
    /// Lifetime HIV diagnosis
    HivDiagnosis,
    /// HIV test in the last 12 months
    TestedHiv12mo,
    /// Heard of PrEP
    KnowsPrep,
    /// Condom used every time
    AlwaysCondom,
    /// Condom used at least sometimes
    EverCondom,
}

impl Variable {
    /// Column name in the analytic dataset
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AgeGroup => "age_group",
            Self::HivKnowledgeScore => "hiv_knowledge_score",
            Self::PartnersLastYear => "partners_last_year",
            Self::MultiplePartners => "multiple_partners",
            Self::AnySti => "any_sti",
            Self::HivDiagnosis => "hiv_diagnosis",
            Self::TestedHiv12mo => "tested_hiv_12mo",
            Self::KnowsPrep => "knows_prep",
            Self::AlwaysCondom => "always_condom",
            Self::EverCondom => "ever_condom",
        }
    }

    /// Numeric value for the design matrix, booleans coded 0/1
    #[must_use]
    pub fn value(self, record: &AnalyticRecord) -> Option<f64> {
        let flag = |b: Option<bool>| b.map(|v| if v { 1.0 } else { 0.0 });
        match self {
            Self::AgeGroup => record.age_group.map(|g| f64::from(g.code())),
            Self::HivKnowledgeScore => record.hiv_knowledge_score.map(f64::from),
            Self::PartnersLastYear => record.partners_last_year.map(f64::from),
            Self::MultiplePartners => flag(record.multiple_partners),
            Self::AnySti => flag(record.any_sti),
            Self::HivDiagnosis => flag(record.hiv_diagnosis),
            Self::TestedHiv12mo => flag(record.tested_hiv_12mo),
            Self::KnowsPrep => flag(record.knows_prep),
            Self::AlwaysCondom => flag(record.always_condom),
            Self::EverCondom => flag(record.ever_condom),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A right-hand-side term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// A single variable
    Main(Variable),
    /// Product of two variables
    Interaction(Variable, Variable),
}

impl Term {
    /// Row label in result tables, `a:b` for interactions
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Main(v) => v.name().to_string(),
            Self::Interaction(a, b) => format!("{}:{}", a.name(), b.name()),
        }
    }

    /// Value for one record; `None` if any component is missing
    #[must_use]
    pub fn value(&self, record: &AnalyticRecord) -> Option<f64> {
        match self {
            Self::Main(v) => v.value(record),
            Self::Interaction(a, b) => Some(a.value(record)? * b.value(record)?),
        }
    }

    /// Variables the term depends on
    #[must_use]
    pub fn variables(&self) -> SmallVec<[Variable; 2]> {
        match self {
            Self::Main(v) => smallvec![*v],
            Self::Interaction(a, b) => smallvec![*a, *b],
        }
    }
}

/// A logistic model: binary outcome, intercept and ordered terms
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpecification {
    /// Model name used in every output
    pub name: String,
    /// Binary outcome variable
    pub outcome: Variable,
    /// Predictor terms, in output order
    pub terms: SmallVec<[Term; 8]>,
    /// Age group the model is restricted to, for stratified fits
    pub stratum: Option<AgeGroup>,
}

/// Name of the model the interaction test uses as the reduced model
pub const INTERACTION_REDUCED_MODEL: &str = "model2_add_partners";
/// Name of the model carrying the age by knowledge interaction
pub const INTERACTION_FULL_MODEL: &str = "model5_age_knowledge_interaction";

impl ModelSpecification {
    /// Model with an intercept only
    pub fn new(name: impl Into<String>, outcome: Variable) -> Self {
        Self {
            name: name.into(),
            outcome,
            terms: SmallVec::new(),
            stratum: None,
        }
    }

    /// Append main-effect terms
    #[must_use]
    pub fn with_predictors(mut self, predictors: &[Variable]) -> Self {
        self.terms.extend(predictors.iter().copied().map(Term::Main));
        self
    }

    /// Append an interaction term
    #[must_use]
    pub fn with_interaction(mut self, a: Variable, b: Variable) -> Self {
        self.terms.push(Term::Interaction(a, b));
        self
    }

    /// Restrict to an age group
    #[must_use]
    pub fn in_stratum(mut self, group: AgeGroup) -> Self {
        self.stratum = Some(group);
        self
    }

    /// Labels of the predictor terms, without the intercept
    #[must_use]
    pub fn predictor_names(&self) -> Vec<String> {
        self.terms.iter().map(Term::name).collect()
    }

    /// Number of parameters including the intercept
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.terms.len() + 1
    }

    /// The five base models, in reporting order
    ///
    /// Models 1 to 4 add predictor blocks one at a time; model 5 adds the
    /// age by knowledge interaction to model 2.
    #[must_use]
    pub fn standard_models() -> Vec<Self> {
        use Variable::{
            AgeGroup, AlwaysCondom, AnySti, HivKnowledgeScore, KnowsPrep, PartnersLastYear,
            TestedHiv12mo,
        };

        let model1 = Self::new("model1_age_knowledge", AlwaysCondom)
            .with_predictors(&[AgeGroup, HivKnowledgeScore]);
        let model2 = Self::new(INTERACTION_REDUCED_MODEL, AlwaysCondom)
            .with_predictors(&[AgeGroup, HivKnowledgeScore, PartnersLastYear]);
        let model3 = Self::new("model3_add_sti_testing", AlwaysCondom).with_predictors(&[
            AgeGroup,
            HivKnowledgeScore,
            PartnersLastYear,
            AnySti,
            TestedHiv12mo,
        ]);
        let model4 = Self::new("model4_add_prep", AlwaysCondom).with_predictors(&[
            AgeGroup,
            HivKnowledgeScore,
            PartnersLastYear,
            AnySti,
            TestedHiv12mo,
            KnowsPrep,
        ]);
        let model5 = Self::new(INTERACTION_FULL_MODEL, AlwaysCondom)
            .with_predictors(&[AgeGroup, HivKnowledgeScore, PartnersLastYear])
            .with_interaction(AgeGroup, HivKnowledgeScore);

        vec![model1, model2, model3, model4, model5]
    }

    /// Knowledge and partner model fitted within one age group
    #[must_use]
    pub fn stratified(group: AgeGroup) -> Self {
        Self::new(format!("stratified_{}", group.slug()), Variable::AlwaysCondom)
            .with_predictors(&[Variable::HivKnowledgeScore, Variable::PartnersLastYear])
            .in_stratum(group)
    }
}

/// Design matrix after listwise deletion
///
/// Columns are stored one vector per term, the intercept first.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    /// Column labels, `Intercept` first
    pub column_names: Vec<String>,
    /// Column values, aligned with `column_names`
    pub columns: Vec<Vec<f64>>,
    /// Outcome coded 0/1
    pub outcome: Vec<f64>,
    /// Records excluded because a model variable was missing
    pub rows_dropped: usize,
}

impl DesignMatrix {
    /// Build the matrix, keeping only records complete on every model variable
    #[must_use]
    pub fn build(spec: &ModelSpecification, records: &[AnalyticRecord]) -> Self {
        let mut column_names = Vec::with_capacity(spec.parameter_count());
        column_names.push(INTERCEPT.to_string());
        column_names.extend(spec.predictor_names());

        let mut columns: Vec<Vec<f64>> =
            vec![Vec::with_capacity(records.len()); column_names.len()];
        let mut outcome = Vec::with_capacity(records.len());
        let mut rows_dropped = 0;

        let mut row: SmallVec<[f64; 8]> = SmallVec::new();
        for record in records {
            let Some(y) = spec.outcome.value(record) else {
                rows_dropped += 1;
                continue;
            };

            row.clear();
            let complete = spec.terms.iter().all(|term| match term.value(record) {
                Some(v) => {
                    row.push(v);
                    true
                }
                None => false,
            });
            if !complete {
                rows_dropped += 1;
                continue;
            }

            outcome.push(y);
            columns[0].push(1.0);
            for (column, value) in columns[1..].iter_mut().zip(&row) {
                column.push(*value);
            }
        }

        Self {
            column_names,
            columns,
            outcome,
            rows_dropped,
        }
    }

    /// Observations in the matrix
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.outcome.len()
    }

    /// Observations with a positive outcome
    #[must_use]
    pub fn positives(&self) -> usize {
        self.outcome.iter().filter(|y| **y > 0.5).count()
    }

    /// Keep only the listed columns, in the given order
    #[must_use]
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            column_names: indices.iter().map(|&i| self.column_names[i].clone()).collect(),
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            outcome: self.outcome.clone(),
            rows_dropped: self.rows_dropped,
        }
    }
}
