//! Signal cleaning applied to a customer's weekly activity before detection.

mod cleaner;
mod interpolate;
mod moving_average;
pub mod wavelet;

pub use cleaner::SignalCleaner;
pub use interpolate::interpolate_zeroes;
pub use moving_average::simple_moving_average;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCleaningMode {
    /// Pass-through.
    #[default]
    None,
    InterpolateZeroes,
    SimpleMovingAverage,
    /// Interpolate zeroes, then moving average.
    InterpolatedMovingAverage,
    WaveletDenoise,
    /// Interpolate zeroes, then wavelet denoise.
    InterpolatedWaveletDenoise,
}

impl SignalCleaningMode {
    pub const ALL: [SignalCleaningMode; 6] = [
        Self::None,
        Self::InterpolateZeroes,
        Self::SimpleMovingAverage,
        Self::InterpolatedMovingAverage,
        Self::WaveletDenoise,
        Self::InterpolatedWaveletDenoise,
    ];

    pub fn interpolates(&self) -> bool {
        matches!(
            self,
            Self::InterpolateZeroes | Self::InterpolatedMovingAverage | Self::InterpolatedWaveletDenoise
        )
    }
}

/// How wavelet coefficients below the noise threshold are shrunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shrinkage {
    /// Keep coefficients above the threshold untouched, zero the rest.
    #[default]
    Hard,
    /// Pull every coefficient toward zero by the threshold.
    Soft,
}

impl Shrinkage {
    pub fn apply(&self, coefficient: f64, threshold: f64) -> f64 {
        match self {
            Shrinkage::Hard => {
                if coefficient.abs() > threshold {
                    coefficient
                } else {
                    0.0
                }
            }
            Shrinkage::Soft => coefficient.signum() * (coefficient.abs() - threshold).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_shrinkage_keeps_large_coefficients() {
        assert_eq!(Shrinkage::Hard.apply(5.0, 2.0), 5.0);
        assert_eq!(Shrinkage::Hard.apply(-1.5, 2.0), 0.0);
    }

    #[test]
    fn soft_shrinkage_pulls_toward_zero() {
        assert_eq!(Shrinkage::Soft.apply(5.0, 2.0), 3.0);
        assert_eq!(Shrinkage::Soft.apply(-5.0, 2.0), -3.0);
        assert_eq!(Shrinkage::Soft.apply(1.0, 2.0), 0.0);
    }

    #[test]
    fn mode_names_are_snake_case() {
        let json = serde_json::to_string(&SignalCleaningMode::InterpolatedWaveletDenoise).unwrap();
        assert_eq!(json, "\"interpolated_wavelet_denoise\"");
    }
}
