use serde::Serialize;
use thiserror::Error;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
pub const DEFAULT_SCORE: u8 = 3;

/// Slider labels, in model input order.
pub const FEATURE_LABELS: [&str; 4] = [
    "Sleep Quality",
    "Academic Performance",
    "Study Load",
    "Extracurricular Activities",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{field} must be between 1 and 5, got {value}")]
    OutOfRange { field: &'static str, value: i64 },
    #[error("{field} is not a whole number: {raw:?}")]
    NotANumber { field: &'static str, raw: String },
}

/// Self-reported scores, each in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureVector {
    pub sleep: u8,
    pub academic: u8,
    pub study: u8,
    pub extracurricular: u8,
}

impl FeatureVector {
    pub fn new(sleep: i64, academic: i64, study: i64, extracurricular: i64) -> Result<Self, InputError> {
        Ok(Self {
            sleep: bounded(FEATURE_LABELS[0], sleep)?,
            academic: bounded(FEATURE_LABELS[1], academic)?,
            study: bounded(FEATURE_LABELS[2], study)?,
            extracurricular: bounded(FEATURE_LABELS[3], extracurricular)?,
        })
    }

    pub fn values(&self) -> [u8; 4] {
        [self.sleep, self.academic, self.study, self.extracurricular]
    }

    pub fn as_row(&self) -> [f64; 4] {
        self.values().map(f64::from)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            sleep: DEFAULT_SCORE,
            academic: DEFAULT_SCORE,
            study: DEFAULT_SCORE,
            extracurricular: DEFAULT_SCORE,
        }
    }
}

fn bounded(field: &'static str, value: i64) -> Result<u8, InputError> {
    if (i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(InputError::OutOfRange { field, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StressBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl StressBand {
    /// First band whose upper bound is strictly above `combined`.
    pub fn from_combined(combined: f64) -> Self {
        if combined < 2.0 {
            StressBand::VeryLow
        } else if combined < 3.0 {
            StressBand::Low
        } else if combined < 4.0 {
            StressBand::Moderate
        } else if combined < 4.5 {
            StressBand::High
        } else {
            StressBand::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StressBand::VeryLow => "Very Low Stress",
            StressBand::Low => "Low Stress",
            StressBand::Moderate => "Moderate Stress",
            StressBand::High => "High Stress",
            StressBand::VeryHigh => "Very High Stress",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            StressBand::VeryLow => "Maintain your routine; you're doing great!",
            StressBand::Low => "Stress is manageable; keep healthy habits.",
            StressBand::Moderate => "Improve sleep & reduce workload where possible.",
            StressBand::High => "Reduce workload, take breaks, focus on balance.",
            StressBand::VeryHigh => "Seek help immediately; prioritize your well-being.",
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            StressBand::VeryLow => "🟢",
            StressBand::Low => "🟡",
            StressBand::Moderate => "🟠",
            StressBand::High => "🔴",
            StressBand::VeryHigh => "⚠️",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub features: FeatureVector,
    pub regression_score: f64,
    pub category: u8,
    pub combined: f64,
    pub band: StressBand,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        self.band.label()
    }

    pub fn advice(&self) -> &'static str {
        self.band.advice()
    }
}
