//! Descriptive statistics for the analytic cohort
//!
//! Condom-use frequency cross-tabulated against the main correlates, with a
//! Pearson chi-squared test of independence for each table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::algorithm::regression::distributions::chi_squared_sf;
use crate::models::{AnalyticDataset, AnalyticRecord, CondomUseFrequency};

/// Variable the cohort is split by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grouping {
    /// Age group
    AgeGroup,
    /// Partner count band: 1, 2, 3-5, 6+
    PartnerBand,
    /// HIV test in the last 12 months
    TestedHiv12mo,
    /// Any lifetime STI
    AnySti,
}

impl Grouping {
    /// Groupings reported, in output order
    pub const ALL: [Self; 4] = [
        Self::AgeGroup,
        Self::PartnerBand,
        Self::TestedHiv12mo,
        Self::AnySti,
    ];

    /// Name used in output tables
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AgeGroup => "age_group",
            Self::PartnerBand => "partners_band",
            Self::TestedHiv12mo => "tested_hiv_12mo",
            Self::AnySti => "any_sti",
        }
    }

    /// Sort key and label of the record's level, `None` when not derivable
    #[must_use]
    pub fn level(self, record: &AnalyticRecord) -> Option<(u8, String)> {
        let yes_no = |flag: Option<bool>| {
            flag.map(|b| if b { (1, "yes".to_string()) } else { (0, "no".to_string()) })
        };
        match self {
            Self::AgeGroup => record.age_group.map(|g| (g.code(), g.label().to_string())),
            Self::PartnerBand => record.partners_last_year.and_then(|n| match n {
                0 => None,
                1 => Some((1, "1".to_string())),
                2 => Some((2, "2".to_string())),
                3..=5 => Some((3, "3-5".to_string())),
                _ => Some((4, "6+".to_string())),
            }),
            Self::TestedHiv12mo => yes_no(record.tested_hiv_12mo),
            Self::AnySti => yes_no(record.any_sti),
        }
    }
}

/// One row of a cross-tabulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabRow {
    /// Grouping variable name
    pub grouping: String,
    /// Level label, `All` for the margin row
    pub level: String,
    /// Respondents in the level
    pub n: u64,
    /// Respondents always using condoms
    pub always: u64,
    /// Respondents sometimes using condoms
    pub sometimes: u64,
    /// Respondents never using condoms
    pub never: u64,
    /// Row percentage always
    pub always_pct: f64,
    /// Row percentage sometimes
    pub sometimes_pct: f64,
    /// Row percentage never
    pub never_pct: f64,
}

impl CrosstabRow {
    fn new(grouping: Grouping, level: String, counts: [u64; 3]) -> Self {
        let n: u64 = counts.iter().sum();
        let pct = |c: u64| {
            if n > 0 {
                100.0 * c as f64 / n as f64
            } else {
                0.0
            }
        };
        Self {
            grouping: grouping.name().to_string(),
            level,
            n,
            always: counts[0],
            sometimes: counts[1],
            never: counts[2],
            always_pct: pct(counts[0]),
            sometimes_pct: pct(counts[1]),
            never_pct: pct(counts[2]),
        }
    }

    fn counts(&self) -> [u64; 3] {
        [self.always, self.sometimes, self.never]
    }
}

/// Condom-use frequency by levels of one grouping
#[derive(Debug, Clone, PartialEq)]
pub struct Crosstab {
    /// Grouping variable
    pub grouping: Grouping,
    /// One row per observed level, in level order
    pub rows: Vec<CrosstabRow>,
    /// Margin over all rows
    pub total: CrosstabRow,
}

/// Pearson chi-squared test of independence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareTest {
    /// Grouping variable name
    pub grouping: String,
    /// Pearson statistic
    pub statistic: f64,
    /// `(rows - 1) (columns - 1)` after dropping empty rows and columns
    pub degrees_of_freedom: u64,
    /// Upper chi-squared tail probability
    pub p_value: f64,
    /// Respondents in the table
    pub n: u64,
}

/// Cross-tabulations and tests for every grouping
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveReport {
    /// Tables in [`Grouping::ALL`] order
    pub crosstabs: Vec<Crosstab>,
    /// Tests for the tables where one is defined
    pub tests: Vec<ChiSquareTest>,
}

/// Functions for descriptive summaries of the cohort
pub struct DescriptiveStatistics;

impl DescriptiveStatistics {
    /// Cross-tabulate condom-use frequency by a grouping
    #[must_use]
    pub fn crosstab(records: &[AnalyticRecord], grouping: Grouping) -> Crosstab {
        let mut levels: BTreeMap<(u8, String), [u64; 3]> = BTreeMap::new();
        for record in records {
            let (Some(level), Some(freq)) = (grouping.level(record), record.condom_use_freq)
            else {
                continue;
            };
            let column = match freq {
                CondomUseFrequency::Always => 0,
                CondomUseFrequency::Sometimes => 1,
                CondomUseFrequency::Never => 2,
            };
            levels.entry(level).or_insert([0; 3])[column] += 1;
        }

        let mut totals = [0u64; 3];
        let rows: Vec<CrosstabRow> = levels
            .into_iter()
            .map(|((_, label), counts)| {
                for (t, c) in totals.iter_mut().zip(counts) {
                    *t += c;
                }
                CrosstabRow::new(grouping, label, counts)
            })
            .collect();

        Crosstab {
            grouping,
            rows,
            total: CrosstabRow::new(grouping, "All".to_string(), totals),
        }
    }

    /// Pearson chi-squared test on a cross-tabulation
    ///
    /// Rows and columns with no respondents are removed first; `None` when
    /// fewer than two rows or columns remain.
    #[must_use]
    pub fn chi_square(table: &Crosstab) -> Option<ChiSquareTest> {
        let column_totals = table.total.counts();
        let columns: Vec<usize> = (0..3).filter(|&j| column_totals[j] > 0).collect();
        let rows: Vec<[u64; 3]> = table
            .rows
            .iter()
            .map(CrosstabRow::counts)
            .filter(|c| c.iter().sum::<u64>() > 0)
            .collect();
        if rows.len() < 2 || columns.len() < 2 {
            return None;
        }

        let n = table.total.n as f64;
        let statistic: f64 = rows
            .iter()
            .flat_map(|row| {
                let row_total = row.iter().sum::<u64>() as f64;
                columns.iter().map(move |&j| {
                    let expected = row_total * column_totals[j] as f64 / n;
                    let diff = row[j] as f64 - expected;
                    diff * diff / expected
                })
            })
            .sum();

        let degrees_of_freedom = (rows.len() - 1) * (columns.len() - 1);
        Some(ChiSquareTest {
            grouping: table.grouping.name().to_string(),
            statistic,
            degrees_of_freedom: degrees_of_freedom as u64,
            p_value: chi_squared_sf(statistic, degrees_of_freedom),
            n: table.total.n,
        })
    }

    /// Tables and tests for every grouping
    #[must_use]
    pub fn describe(dataset: &AnalyticDataset) -> DescriptiveReport {
        let crosstabs: Vec<Crosstab> = Grouping::ALL
            .iter()
            .map(|g| Self::crosstab(dataset.records(), *g))
            .collect();
        let tests = crosstabs.iter().filter_map(Self::chi_square).collect();
        DescriptiveReport { crosstabs, tests }
    }

    /// Render the tables as text
    #[must_use]
    pub fn generate_summary(report: &DescriptiveReport) -> String {
        let mut summary = String::new();
        summary.push_str("Condom Use by Correlates:\n");
        for table in &report.crosstabs {
            summary.push_str(&format!("  {}:\n", table.grouping.name()));
            for row in table.rows.iter().chain(std::iter::once(&table.total)) {
                summary.push_str(&format!(
                    "    {:<6} n={:<6} always {:>5.1}%  sometimes {:>5.1}%  never {:>5.1}%\n",
                    row.level, row.n, row.always_pct, row.sometimes_pct, row.never_pct
                ));
            }
            if let Some(test) = report
                .tests
                .iter()
                .find(|t| t.grouping == table.grouping.name())
            {
                summary.push_str(&format!(
                    "    chi2 = {:.3}, df = {}, p = {:.4}\n",
                    test.statistic, test.degrees_of_freedom, test.p_value
                ));
            }
        }
        summary
    }
}
