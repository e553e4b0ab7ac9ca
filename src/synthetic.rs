//! Reproducible synthetic survey exports
//!
//! Generates respondents coded the way the ENSSEX export codes them, with
//! the usual defects mixed in: under-age respondents, missing ages, the
//! 999 partner code, over-cap partner counts, non-response codes and
//! all-missing knowledge blocks. The condom-use answer follows a logistic
//! model in age group, knowledge and partners so the fitted models have
//! signal to find.

use std::path::Path;

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::error::util::safe_create_file;
use crate::models::AgeGroup;
use crate::report::{rows_to_batch, write_parquet};
use crate::schema::codebook::{KNOWLEDGE_ITEMS, NO, YES};

/// One respondent with codebook column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    pub folio: String,
    pub p3: Option<i64>,
    pub p4: Option<i64>,
    pub p71: Option<i64>,
    pub p73: Option<i64>,
    pub i_1_p212: Option<i64>,
    pub i_2_p212: Option<i64>,
    pub i_3_p212: Option<i64>,
    pub i_4_p212: Option<i64>,
    pub i_5_p212: Option<i64>,
    pub i_6_p212: Option<i64>,
    pub p202_sifilis: Option<i64>,
    pub p202_gonorrea: Option<i64>,
    pub p202_vih: Option<i64>,
    pub p208: Option<i64>,
    pub p210: Option<i64>,
    pub p211: Option<i64>,
    pub p213: Option<i64>,
}

/// Generator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSurvey {
    /// Respondents to generate
    pub respondents: usize,
    /// Seed of the random number generator
    pub seed: u64,
}

impl SyntheticSurvey {
    /// Create a generator
    #[must_use]
    pub fn new(respondents: usize, seed: u64) -> Self {
        Self { respondents, seed }
    }

    /// Generate the respondents; the same seed always gives the same rows
    #[must_use]
    pub fn rows(&self) -> Vec<SurveyRow> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.respondents)
            .map(|i| respondent(&mut rng, i))
            .collect()
    }

    /// Generate the respondents as a record batch
    pub fn generate(&self) -> Result<RecordBatch> {
        rows_to_batch(&self.rows())
    }

    /// Write the survey as a Parquet table
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        write_parquet(path, &self.generate()?)
    }

    /// Write the survey as delimited text with a header row
    pub fn write_delimited(&self, path: &Path, delimiter: u8) -> Result<()> {
        let batch = self.generate()?;
        let file = safe_create_file(path, "writing the synthetic survey export")?;
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(delimiter)
            .build(file);
        writer.write(&batch)?;
        Ok(())
    }
}

fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

// Code of a yes/no item with a small non-response share
fn binary_item(rng: &mut StdRng, p_yes: f64) -> Option<i64> {
    if rng.random_bool(0.01) {
        return Some(9);
    }
    Some(if rng.random_bool(p_yes.clamp(0.0, 1.0)) { YES as i64 } else { NO as i64 })
}

fn respondent(rng: &mut StdRng, index: usize) -> SurveyRow {
    let age: Option<i64> = if rng.random_bool(0.01) {
        None
    } else if rng.random_bool(0.03) {
        Some(rng.random_range(15..18))
    } else {
        Some(rng.random_range(18..90))
    };

    // Knowledge items, correct with a probability set by a latent propensity
    let propensity: f64 = rng.random();
    let block_missing = rng.random_bool(0.02);
    let mut score = 0;
    let items: Vec<Option<i64>> = KNOWLEDGE_ITEMS
        .iter()
        .map(|item| {
            if block_missing || rng.random_bool(0.03) {
                return None;
            }
            let correct = rng.random_bool(0.35 + 0.55 * propensity);
            if correct {
                score += 1;
            }
            let wrong = if item.correct_code == YES { NO } else { YES };
            let code = if correct { item.correct_code } else { wrong };
            Some(code as i64)
        })
        .collect();

    let partners: i64 = match rng.random::<f64>() {
        r if r < 0.08 => 0,
        r if r < 0.10 => 999,
        r if r < 0.11 => rng.random_range(101..300),
        r if r < 0.66 => 1,
        r if r < 0.80 => 2,
        r if r < 0.95 => rng.random_range(3..=5),
        _ => rng.random_range(6..=30),
    };

    let age_code = age
        .and_then(|a| AgeGroup::from_age(a as f64, 18.0))
        .map_or(3.0, |g| f64::from(g.code()));
    let effective_partners = if partners == 999 { 1 } else { partners.min(20) };
    let eta = -0.6 + 0.3 * f64::from(score)
        - 0.2 * (age_code - 1.0)
        - 0.1 * effective_partners as f64;
    let condom_use = if rng.random_bool(0.03) {
        9
    } else if rng.random_bool(sigmoid(eta)) {
        1
    } else if rng.random_bool(0.5) {
        2
    } else {
        3
    };

    let tested = rng.random_bool(0.3);
    let tested_code = if rng.random_bool(0.02) {
        9
    } else if tested {
        1
    } else {
        2
    };

    SurveyRow {
        folio: format!("S{:06}", index + 1),
        p3: Some(rng.random_range(1..=2)),
        p4: age,
        p71: Some(partners),
        p73: Some(condom_use),
        i_1_p212: items[0],
        i_2_p212: items[1],
        i_3_p212: items[2],
        i_4_p212: items[3],
        i_5_p212: items[4],
        i_6_p212: items[5],
        p202_sifilis: binary_item(rng, 0.03),
        p202_gonorrea: binary_item(rng, 0.03),
        p202_vih: binary_item(rng, 0.01),
        p208: Some(tested_code),
        p210: tested.then(|| rng.random_range(1..=6)),
        p211: (!tested).then(|| rng.random_range(1..=8)),
        p213: binary_item(rng, 0.2 + 0.3 * propensity),
    }
}
