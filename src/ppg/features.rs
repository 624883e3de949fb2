//! Window feature extraction
//!
//! Statistical features of a conditioned window handed to the prediction
//! strategy.

use serde::{Deserialize, Serialize};

use crate::ppg::conditioner::{mean_std, SignalWindow};

/// Features of one conditioned window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalFeatures {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub len: usize,
}

impl SignalFeatures {
    /// Extract features from a conditioned window
    pub fn extract(window: &SignalWindow) -> Self {
        let samples = window.samples();
        let (mean, std_dev) = mean_std(samples);
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean,
            std_dev,
            min: if samples.is_empty() { 0.0 } else { min },
            max: if samples.is_empty() { 0.0 } else { max },
            len: samples.len(),
        }
    }

    /// Peak-to-peak amplitude
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.std_dev.is_finite()
    }
}
