//! Signal conditioning
//!
//! Turns the buffered red-channel samples of one scan into a fixed-length
//! window:
//! - single-pole smoothing to suppress per-frame sensor noise
//! - z-score normalization
//! - linear resampling to the target window length

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::error::ComputeError;

/// Conditioned signal of exactly the configured target length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWindow(Vec<f64>);

impl SignalWindow {
    pub fn samples(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Conditioner for raw scan buffers
pub struct SignalConditioner;

impl SignalConditioner {
    /// Condition a raw buffer into a window of `config.target_window_len`.
    pub fn condition(raw: &[f64], config: &ScanConfig) -> Result<SignalWindow, ComputeError> {
        if raw.len() < config.min_raw_samples {
            return Err(ComputeError::InsufficientSignal {
                captured: raw.len(),
                required: config.min_raw_samples,
            });
        }

        let smoothed = smooth(raw, config.smoothing_alpha);
        let normalized = z_score(&smoothed);
        Ok(SignalWindow(resample(&normalized, config.target_window_len)))
    }
}

/// Exponential smoothing: `y[0] = x[0]`, `y[i] = a*x[i] + (1-a)*y[i-1]`
pub fn smooth(signal: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(signal.len());
    for (i, &x) in signal.iter().enumerate() {
        let y = if i == 0 {
            x
        } else {
            alpha * x + (1.0 - alpha) * out[i - 1]
        };
        out.push(y);
    }
    out
}

/// Subtract the mean and divide by the population standard deviation.
/// A zero deviation is replaced by 1, so constant input maps to zeros.
pub fn z_score(signal: &[f64]) -> Vec<f64> {
    let (mean, std_dev) = mean_std(signal);
    let divisor = if std_dev == 0.0 { 1.0 } else { std_dev };
    signal.iter().map(|x| (x - mean) / divisor).collect()
}

/// Linear interpolation to `target_len` points spanning the whole input.
pub fn resample(signal: &[f64], target_len: usize) -> Vec<f64> {
    if signal.len() == target_len {
        return signal.to_vec();
    }
    match (signal.len(), target_len) {
        (_, 0) => return Vec::new(),
        (0, _) => return vec![0.0; target_len],
        (1, _) => return vec![signal[0]; target_len],
        (_, 1) => return vec![signal[0]],
        _ => {}
    }

    let last = signal.len() - 1;
    let factor = last as f64 / (target_len - 1) as f64;
    (0..target_len)
        .map(|i| {
            let position = i as f64 * factor;
            let lower = (position.floor() as usize).min(last);
            let upper = (position.ceil() as usize).min(last);
            let weight = position - lower as f64;
            signal[lower] * (1.0 - weight) + signal[upper] * weight
        })
        .collect()
}

/// Mean and population standard deviation; zeros for empty input
pub fn mean_std(signal: &[f64]) -> (f64, f64) {
    if signal.is_empty() {
        return (0.0, 0.0);
    }
    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    let variance = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    fn pulsatile(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 150.0 + 4.0 * (i as f64 * 0.4).sin())
            .collect()
    }

    #[test]
    fn test_smoothing_uses_previous_output() {
        let out = smooth(&[10.0, 20.0, 20.0], 0.8);
        assert_abs_diff_eq!(out[0], 10.0);
        assert_abs_diff_eq!(out[1], 18.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 0.8 * 20.0 + 0.2 * 18.0, epsilon = 1e-12);
    }

    #[test]
    fn test_z_score_moments() {
        let out = z_score(&pulsatile(257));
        let (mean, std_dev) = mean_std(&out);
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(std_dev, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_z_score_constant_input_is_zero() {
        let out = z_score(&[42.0; 60]);
        assert!(out.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_resample_identity_at_target_length() {
        let signal = pulsatile(300);
        assert_eq!(resample(&signal, 300), signal);
    }

    #[test]
    fn test_resample_keeps_endpoints() {
        let signal = vec![0.0, 10.0, 20.0, 30.0];
        let out = resample(&signal, 7);
        assert_eq!(out.len(), 7);
        assert_abs_diff_eq!(out[0], 0.0);
        assert_abs_diff_eq!(out[3], 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[6], 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_condition_always_hits_target_length() {
        let config = ScanConfig::default();
        for len in [50, 51, 137, 299, 300, 301, 640] {
            let window = SignalConditioner::condition(&pulsatile(len), &config).unwrap();
            assert_eq!(window.len(), config.target_window_len, "input length {len}");
        }
    }

    #[test]
    fn test_condition_rejects_short_signal() {
        let config = ScanConfig::default();
        let err = SignalConditioner::condition(&pulsatile(49), &config).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::InsufficientSignal {
                captured: 49,
                required: 50
            }
        ));
        assert!(err.is_retryable());
    }
}
