use crate::error::{SimError, SimResult};

/// Simple moving average with the same length as the input. The first
/// `window - 1` outputs average over the samples seen so far (1, 2, ...),
/// after which a full window slides.
pub fn simple_moving_average(signal: &[f64], window: usize) -> SimResult<Vec<f64>> {
    if window == 0 || window > signal.len() {
        return Err(SimError::InvalidWindow { window, len: signal.len() });
    }

    let mut out = Vec::with_capacity(signal.len());
    let mut sum = 0.0;
    for (i, &x) in signal.iter().enumerate() {
        sum += x;
        if i >= window {
            sum -= signal[i - window];
        }
        out.push(sum / (i + 1).min(window) as f64);
    }
    Ok(out)
}
