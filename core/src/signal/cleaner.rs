use super::{interpolate_zeroes, simple_moving_average, wavelet, Shrinkage, SignalCleaningMode};
use crate::{
    config::{CleaningConfig, DEFAULT_MOVING_AVERAGE_WINDOW},
    error::{SimError, SimResult},
};

/// Dispatches a weekly signal through the configured cleaning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalCleaner {
    pub mode: SignalCleaningMode,
    pub window: usize,
    pub shrinkage: Shrinkage,
}

impl SignalCleaner {
    pub fn new(mode: SignalCleaningMode) -> Self {
        Self {
            mode,
            window: DEFAULT_MOVING_AVERAGE_WINDOW,
            shrinkage: Shrinkage::default(),
        }
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self {
            mode: config.mode,
            window: config.moving_average_window,
            shrinkage: config.shrinkage,
        }
    }

    /// Cleaned signal, same length as the input.
    pub fn clean(&self, signal: &[f64]) -> SimResult<Vec<f64>> {
        let prepared = if self.mode.interpolates() {
            interpolate_zeroes(signal)
        } else {
            signal.to_vec()
        };

        match self.mode {
            SignalCleaningMode::None | SignalCleaningMode::InterpolateZeroes => Ok(prepared),
            SignalCleaningMode::SimpleMovingAverage | SignalCleaningMode::InterpolatedMovingAverage => {
                simple_moving_average(&prepared, self.window)
            }
            SignalCleaningMode::WaveletDenoise | SignalCleaningMode::InterpolatedWaveletDenoise => {
                if prepared.is_empty() {
                    return Err(SimError::EmptySignal { context: format!("{:?} cleaning", self.mode) });
                }
                let mut denoised = wavelet::denoise(&prepared, self.shrinkage)?;
                let padding = denoised.len() - prepared.len();
                Ok(denoised.split_off(padding))
            }
        }
    }
}
