//! Compound weekly count distribution.
//!
//! Two stages: a Bernoulli(frequency) gate decides whether anything happens
//! in a week, then a continuous magnitude draw (mean, std_dev) is rounded to
//! the nearest non-negative integer.

use crate::{
    error::{SimError, SimResult},
    rng::SimRng,
};
use rand_distr::{Bernoulli, Distribution, LogNormal, Normal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParams {
    pub mean: f64,
    pub std_dev: f64,
    /// Probability that any activity occurs in a given week.
    pub frequency: f64,
}

impl DistributionParams {
    pub fn new(mean: f64, std_dev: f64, frequency: f64) -> SimResult<Self> {
        let params = Self { mean, std_dev, frequency };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.mean.is_finite() || self.mean < 0.0 {
            return Err(self.domain_error("mean must be finite and >= 0"));
        }
        if !self.std_dev.is_finite() || self.std_dev < 0.0 {
            return Err(self.domain_error("std_dev must be finite and >= 0"));
        }
        if !(0.0..=1.0).contains(&self.frequency) {
            return Err(self.domain_error("frequency must be in [0, 1]"));
        }
        Ok(())
    }

    /// Same frequency, magnitude scaled by `factor` (coefficient of variation kept).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            std_dev: self.std_dev * factor,
            frequency: self.frequency,
        }
    }

    fn domain_error(&self, reason: &str) -> SimError {
        SimError::DistributionDomain {
            mean: self.mean,
            std_dev: self.std_dev,
            frequency: self.frequency,
            reason: reason.to_string(),
        }
    }
}

/// Which continuous distribution shapes the weekly count once the gate fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountModel {
    /// Normal(mean, std_dev), negative draws clipped to 0.
    #[default]
    TruncatedNormal,
    /// Log-normal moment-matched to (mean, std_dev); never negative.
    /// Prefer when std_dev is large relative to mean.
    LogNormal,
}

#[derive(Debug, Clone, Copy)]
enum Magnitude {
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
}

#[derive(Debug, Clone, Copy)]
pub struct CompoundCountDistribution {
    params: DistributionParams,
    gate: Bernoulli,
    magnitude: Magnitude,
}

impl CompoundCountDistribution {
    pub fn new(params: DistributionParams, model: CountModel) -> SimResult<Self> {
        params.validate()?;

        let gate = Bernoulli::new(params.frequency)
            .map_err(|e| params.domain_error(&e.to_string()))?;

        let magnitude = match model {
            CountModel::TruncatedNormal => Magnitude::Normal(
                Normal::new(params.mean, params.std_dev)
                    .map_err(|e| params.domain_error(&e.to_string()))?,
            ),
            CountModel::LogNormal => {
                let (log_mean, log_std_dev) = log_normal_moments(params.mean, params.std_dev)?;
                Magnitude::LogNormal(
                    LogNormal::new(log_mean, log_std_dev)
                        .map_err(|e| params.domain_error(&e.to_string()))?,
                )
            }
        };

        Ok(Self { params, gate, magnitude })
    }

    pub fn params(&self) -> &DistributionParams {
        &self.params
    }

    /// Draw one week's count.
    pub fn sample(&self, rng: &mut SimRng) -> u32 {
        if !self.gate.sample(rng) {
            return 0;
        }
        let raw = match &self.magnitude {
            Magnitude::Normal(normal) => normal.sample(rng).max(0.0),
            Magnitude::LogNormal(log_normal) => log_normal.sample(rng),
        };
        raw.round().min(u32::MAX as f64) as u32
    }
}

/// Log-space (mean, std_dev) whose log-normal has the given linear-space
/// mean and standard deviation.
pub fn log_normal_moments(mean: f64, std_dev: f64) -> SimResult<(f64, f64)> {
    if !(mean > 0.0 && std_dev > 0.0) {
        return Err(SimError::DistributionDomain {
            mean,
            std_dev,
            frequency: f64::NAN,
            reason: "log-normal moment matching needs mean > 0 and std_dev > 0".into(),
        });
    }
    let variance = std_dev * std_dev;
    let log_mean = (mean * mean / (variance + mean * mean).sqrt()).ln();
    let log_std_dev = (1.0 + variance / (mean * mean)).ln().sqrt();
    Ok((log_mean, log_std_dev))
}
