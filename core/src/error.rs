use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Invalid contract: start {start} is after end {end}")]
    InvalidContract { start: NaiveDate, end: NaiveDate },

    #[error("Wavelet level must be between 0 and {max} but was {level}")]
    InvalidLevel { level: u32, max: u32 },

    #[error("Coefficient array length must be a power of 2, got {len}")]
    NotPowerOfTwo { len: usize },

    #[error("Moving average window {window} is invalid for a signal of length {len}")]
    InvalidWindow { window: usize, len: usize },

    #[error("Distribution parameters out of domain (mean={mean}, std_dev={std_dev}, frequency={frequency}): {reason}")]
    DistributionDomain {
        mean: f64,
        std_dev: f64,
        frequency: f64,
        reason: String,
    },

    #[error("Empty signal: {context}")]
    EmptySignal { context: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field, reason: reason.into() }
    }
}

pub type SimResult<T> = Result<T, SimError>;
