//! Fixtures shared by the integration tests

use enssex_correlates::algorithm::cohort::CohortFilter;
use enssex_correlates::algorithm::variables::VariableConstructor;
use enssex_correlates::schema::SurveyColumns;
use enssex_correlates::schema::codebook::{KNOWLEDGE_ITEMS, NO, YES};
use enssex_correlates::synthetic::SurveyRow;
use enssex_correlates::{AnalyticDataset, ModelFitConfig, RawRecord, RawSurvey};

/// Knowledge answers scoring exactly `score`: the first `score` items right, the rest wrong
#[must_use]
pub fn knowledge_answers(score: u8) -> [Option<f64>; 6] {
    std::array::from_fn(|i| {
        let item = KNOWLEDGE_ITEMS[i];
        let wrong = if item.correct_code == YES { NO } else { YES };
        Some(if i < usize::from(score) { item.correct_code } else { wrong })
    })
}

/// A respondent with the fields the cohort filter and models use
#[must_use]
pub fn respondent(age: f64, partners: f64, condom_use: f64, score: u8) -> RawRecord {
    RawRecord {
        age: Some(age),
        partners: Some(partners),
        condom_use: Some(condom_use),
        knowledge_items: knowledge_answers(score),
        ..RawRecord::default()
    }
}

/// Wrap records as an in-memory survey
#[must_use]
pub fn survey(records: Vec<RawRecord>) -> RawSurvey {
    RawSurvey {
        source: "fixture".to_string(),
        columns: SurveyColumns::default(),
        records,
    }
}

/// Derive and filter records with the default rules
#[must_use]
pub fn cohort(records: Vec<RawRecord>) -> AnalyticDataset {
    let (candidates, _) = VariableConstructor::default().derive_all(&survey(records));
    CohortFilter::new().apply(candidates).0
}

/// Fitting settings for tests: single-threaded, no progress bar
#[must_use]
pub fn sequential_fit_config() -> ModelFitConfig {
    ModelFitConfig {
        parallel: false,
        ..ModelFitConfig::default()
    }
}

/// Survey rows with hand-computable derived values
///
/// Respondent `i` (0-based) is aged `20 + i % 60`, reports `0` partners for
/// `i < zero_partner_rows` and `1 + i % 4` otherwise, answers condom-use code
/// `1 + i % 3` and has knowledge score `i % 7`.
#[must_use]
pub fn scripted_rows(respondents: usize, zero_partner_rows: usize) -> Vec<SurveyRow> {
    (0..respondents)
        .map(|i| {
            let items = knowledge_answers((i % 7) as u8).map(|a| a.map(|c| c as i64));
            SurveyRow {
                folio: format!("F{i:04}"),
                p3: Some(1 + (i % 2) as i64),
                p4: Some(20 + (i % 60) as i64),
                p71: Some(if i < zero_partner_rows { 0 } else { 1 + (i % 4) as i64 }),
                p73: Some(1 + (i % 3) as i64),
                i_1_p212: items[0],
                i_2_p212: items[1],
                i_3_p212: items[2],
                i_4_p212: items[3],
                i_5_p212: items[4],
                i_6_p212: items[5],
                p202_sifilis: Some(if i % 11 == 0 { 1 } else { 2 }),
                p202_gonorrea: Some(2),
                p202_vih: Some(2),
                p208: Some(if i % 4 == 0 { 1 } else { 2 }),
                p210: (i % 4 == 0).then_some(1),
                p211: (i % 4 != 0).then_some(3),
                p213: Some(if i % 5 == 0 { 1 } else { 2 }),
            }
        })
        .collect()
}
