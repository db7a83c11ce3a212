//! Orthonormal Haar wavelet transform with dyadic band isolation.
//!
//! Coefficients are stored as a pyramid. For `n = 2^L` samples:
//!
//! ```text
//! index:  0 | 1 | 2..4 | 4..8 | ... | n/2..n
//! level:  0 | L | L-1  | L-2  | ... | 1
//! ```
//!
//! Level 0 is the DC term, level `L` the coarsest detail band and level 1
//! the finest. Level `k >= 1` occupies `[2^(L-k), 2^(L-k+1))`.

use super::Shrinkage;
use crate::error::{SimError, SimResult};
use std::f64::consts::FRAC_1_SQRT_2;

/// MAD of Gaussian noise divided by this estimates its standard deviation.
const MAD_TO_SIGMA: f64 = 0.6745;

/// Number of detail levels for a power-of-two length.
pub fn levels(len: usize) -> SimResult<u32> {
    if len == 0 || !len.is_power_of_two() {
        return Err(SimError::NotPowerOfTwo { len });
    }
    Ok(len.trailing_zeros())
}

/// Prepend zeros up to the next power of two. The most recent samples keep
/// their positions relative to the end.
pub fn pad_to_power_of_two(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let target = signal.len().next_power_of_two();
    let mut out = vec![0.0; target - signal.len()];
    out.extend_from_slice(signal);
    out
}

pub fn transform(signal: &[f64]) -> SimResult<Vec<f64>> {
    let n = signal.len();
    levels(n)?;

    let mut out = signal.to_vec();
    let mut scratch = vec![0.0; n];
    let mut len = n;
    while len > 1 {
        let half = len / 2;
        for i in 0..half {
            let (a, b) = (out[2 * i], out[2 * i + 1]);
            scratch[i] = (a + b) * FRAC_1_SQRT_2;
            scratch[half + i] = (a - b) * FRAC_1_SQRT_2;
        }
        out[..len].copy_from_slice(&scratch[..len]);
        len = half;
    }
    Ok(out)
}

pub fn inverse(coefficients: &[f64]) -> SimResult<Vec<f64>> {
    let n = coefficients.len();
    levels(n)?;

    let mut out = coefficients.to_vec();
    let mut scratch = vec![0.0; n];
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        for i in 0..half {
            let (s, d) = (out[i], out[half + i]);
            scratch[2 * i] = (s + d) * FRAC_1_SQRT_2;
            scratch[2 * i + 1] = (s - d) * FRAC_1_SQRT_2;
        }
        out[..len].copy_from_slice(&scratch[..len]);
        len *= 2;
    }
    Ok(out)
}

/// Transform then inverse; reproduces the input up to rounding.
pub fn identity_transform(signal: &[f64]) -> SimResult<Vec<f64>> {
    inverse(&transform(signal)?)
}

/// Index range of one band inside a coefficient array of `2^max` entries.
fn band(level: u32, max: u32) -> SimResult<std::ops::Range<usize>> {
    if level > max {
        return Err(SimError::InvalidLevel { level, max });
    }
    if level == 0 {
        return Ok(0..1);
    }
    let shift = max - level;
    Ok((1usize << shift)..(1usize << (shift + 1)))
}

pub fn isolate_frequency_level(coefficients: &[f64], level: u32) -> SimResult<Vec<f64>> {
    isolate_frequency_levels(coefficients, &[level])
}

/// Zero every coefficient outside the union of the given bands.
pub fn isolate_frequency_levels(coefficients: &[f64], levels_to_keep: &[u32]) -> SimResult<Vec<f64>> {
    let max = levels(coefficients.len())?;
    let mut out = vec![0.0; coefficients.len()];
    for &level in levels_to_keep {
        let range = band(level, max)?;
        out[range.clone()].copy_from_slice(&coefficients[range]);
    }
    Ok(out)
}

pub fn reconstruct_by_frequency(signal: &[f64], level: u32) -> SimResult<Vec<f64>> {
    reconstruct_by_frequencies(signal, &[level])
}

/// The part of `signal` carried by the given bands.
pub fn reconstruct_by_frequencies(signal: &[f64], levels_to_keep: &[u32]) -> SimResult<Vec<f64>> {
    let coefficients = transform(signal)?;
    inverse(&isolate_frequency_levels(&coefficients, levels_to_keep)?)
}

/// Universal-threshold denoising. The noise level is estimated from the
/// finest band; the DC term and the coarsest detail are never shrunk.
/// Returns the padded-length signal; padding sits at the front.
pub fn denoise(signal: &[f64], shrinkage: Shrinkage) -> SimResult<Vec<f64>> {
    if signal.is_empty() {
        return Err(SimError::EmptySignal { context: "wavelet denoise".into() });
    }
    let padded = pad_to_power_of_two(signal);
    let n = padded.len();
    if n < 4 {
        return Ok(padded);
    }
    let mut coefficients = transform(&padded)?;

    let sigma = median_absolute_deviation(&coefficients[n / 2..]) / MAD_TO_SIGMA;
    let threshold = sigma * (2.0 * (n as f64).ln()).sqrt();
    for c in &mut coefficients[2..] {
        *c = shrinkage.apply(*c, threshold);
    }
    log::debug!("wavelet: n={n} sigma={sigma:.3} threshold={threshold:.3}");

    inverse(&coefficients)
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn median_absolute_deviation(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    let centre = median(&mut sorted);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - centre).abs()).collect();
    median(&mut deviations)
}
