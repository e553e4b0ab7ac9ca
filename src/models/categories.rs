//! Categorical variables with a fixed codebook coding

use std::fmt;

use serde::Serialize;

/// Ordered age bins used for stratification and as an ordinal predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeGroup {
    /// 18 to 29 years (lower bound follows the configured minimum age)
    #[serde(rename = "18-29")]
    Age18To29,
    /// 30 to 39 years
    #[serde(rename = "30-39")]
    Age30To39,
    /// 40 to 49 years
    #[serde(rename = "40-49")]
    Age40To49,
    /// 50 to 59 years
    #[serde(rename = "50-59")]
    Age50To59,
    /// 60 to 69 years
    #[serde(rename = "60-69")]
    Age60To69,
    /// 70 to 79 years
    #[serde(rename = "70-79")]
    Age70To79,
    /// 80 years and older
    #[serde(rename = "80+")]
    Age80Plus,
}

impl AgeGroup {
    /// All groups in ordinal order
    pub const ALL: [Self; 7] = [
        Self::Age18To29,
        Self::Age30To39,
        Self::Age40To49,
        Self::Age50To59,
        Self::Age60To69,
        Self::Age70To79,
        Self::Age80Plus,
    ];

    /// Lower edge of the youngest group
    pub const MIN_AGE: f64 = 18.0;

    /// Bucket an age in years
    ///
    /// `None` when not finite or below `minimum_age`; a `minimum_age` under
    /// [`Self::MIN_AGE`] never admits ages the bins do not cover.
    #[must_use]
    pub fn from_age(age: f64, minimum_age: f64) -> Option<Self> {
        if !age.is_finite() || age < minimum_age.max(Self::MIN_AGE) {
            return None;
        }

        let group = match age {
            a if a < 30.0 => Self::Age18To29,
            a if a < 40.0 => Self::Age30To39,
            a if a < 50.0 => Self::Age40To49,
            a if a < 60.0 => Self::Age50To59,
            a if a < 70.0 => Self::Age60To69,
            a if a < 80.0 => Self::Age70To79,
            _ => Self::Age80Plus,
        };
        Some(group)
    }

    /// Map a precomputed codebook code (1..=7)
    #[must_use]
    pub fn from_code(code: f64) -> Option<Self> {
        if code.fract() != 0.0 || !(1.0..=7.0).contains(&code) {
            return None;
        }
        Self::ALL.get(code as usize - 1).copied()
    }

    /// Ordinal code, 1 for the youngest group
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Age18To29 => 1,
            Self::Age30To39 => 2,
            Self::Age40To49 => 3,
            Self::Age50To59 => 4,
            Self::Age60To69 => 5,
            Self::Age70To79 => 6,
            Self::Age80Plus => 7,
        }
    }

    /// Label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Age18To29 => "18-29",
            Self::Age30To39 => "30-39",
            Self::Age40To49 => "40-49",
            Self::Age50To59 => "50-59",
            Self::Age60To69 => "60-69",
            Self::Age70To79 => "70-79",
            Self::Age80Plus => "80+",
        }
    }

    /// Label usable inside identifiers such as model names
    #[must_use]
    pub fn slug(self) -> String {
        self.label().replace('-', "_").replace('+', "plus")
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Condom use with partners in the last year (codebook item p73)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CondomUseFrequency {
    /// Code 1
    Always,
    /// Code 2
    Sometimes,
    /// Code 3
    Never,
}

impl CondomUseFrequency {
    /// All levels in codebook order
    pub const ALL: [Self; 3] = [Self::Always, Self::Sometimes, Self::Never];

    /// Map a raw p73 code; every other code (non-response included) is `None`
    #[must_use]
    pub fn from_code(code: f64) -> Option<Self> {
        match code {
            c if c == 1.0 => Some(Self::Always),
            c if c == 2.0 => Some(Self::Sometimes),
            c if c == 3.0 => Some(Self::Never),
            _ => None,
        }
    }

    /// Codebook code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Always => 1,
            Self::Sometimes => 2,
            Self::Never => 3,
        }
    }

    /// Label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::Sometimes => "Sometimes",
            Self::Never => "Never",
        }
    }

    /// Binary projection: condom used every time
    #[must_use]
    pub const fn is_always(self) -> bool {
        matches!(self, Self::Always)
    }

    /// Binary projection: condom used at least sometimes
    #[must_use]
    pub const fn is_ever(self) -> bool {
        matches!(self, Self::Always | Self::Sometimes)
    }
}

impl fmt::Display for CondomUseFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
