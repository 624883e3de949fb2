//! Prediction strategies
//!
//! The estimator asks a [`PredictionStrategy`] for a raw value from window
//! features. [`HeuristicStrategy`] is a placeholder that applies two fixed
//! adjustments and bounded jitter around a physiological midpoint; a trained
//! model can replace it without touching conditioning or history blending.
//!
//! [`OutlierSimulation`] is the separate, switchable step that occasionally
//! pushes a reading into the elevated range to mimic model variance.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::config::{EstimatorConfig, OutlierConfig};
use crate::error::ComputeError;
use crate::ppg::features::SignalFeatures;

/// Produces a raw estimate from window features
pub trait PredictionStrategy: Send {
    /// Name recorded in every estimate this strategy produces
    fn name(&self) -> &str;

    fn predict(&mut self, features: &SignalFeatures) -> Result<f64, ComputeError>;
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Midpoint plus signal-quality adjustments plus uniform jitter
pub struct HeuristicStrategy {
    base_value: f64,
    low_variance_std: f64,
    low_variance_correction: f64,
    high_mean_threshold: f64,
    high_mean_correction: f64,
    jitter_amplitude: f64,
    rng: StdRng,
}

impl HeuristicStrategy {
    /// Strategy from estimator settings.
    ///
    /// An invalid jitter amplitude is reported by [`predict`](PredictionStrategy::predict)
    /// as a prediction error; run [`EngineConfig::validate`](crate::config::EngineConfig::validate)
    /// to reject it up front.
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            base_value: config.base_value,
            low_variance_std: config.low_variance_std,
            low_variance_correction: config.low_variance_correction,
            high_mean_threshold: config.high_mean_threshold,
            high_mean_correction: config.high_mean_correction,
            jitter_amplitude: config.jitter_amplitude,
            rng: rng_from_seed(config.seed),
        }
    }

    /// Estimate before jitter is added
    pub fn adjusted_base(&self, features: &SignalFeatures) -> f64 {
        let mut value = self.base_value;
        if features.std_dev < self.low_variance_std {
            value += self.low_variance_correction;
        }
        if features.mean > self.high_mean_threshold {
            value += self.high_mean_correction;
        }
        value
    }
}

impl PredictionStrategy for HeuristicStrategy {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn predict(&mut self, features: &SignalFeatures) -> Result<f64, ComputeError> {
        if !features.is_finite() {
            return Err(ComputeError::PredictionError(
                "window features are not finite".to_string(),
            ));
        }
        if !(self.jitter_amplitude.is_finite() && self.jitter_amplitude >= 0.0) {
            return Err(ComputeError::PredictionError(format!(
                "invalid jitter amplitude {}",
                self.jitter_amplitude
            )));
        }
        let jitter = self
            .rng
            .gen_range(-self.jitter_amplitude..=self.jitter_amplitude);
        Ok(self.adjusted_base(features) + jitter)
    }
}

/// Occasional simulated elevated reading
pub struct OutlierSimulation {
    config: OutlierConfig,
    rng: StdRng,
}

impl OutlierSimulation {
    pub fn new(config: OutlierConfig, seed: Option<u64>) -> Self {
        // Offset the seed so the outlier draw is independent of the jitter
        Self {
            config,
            rng: rng_from_seed(seed.map(|s| s.wrapping_add(1))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Returns the possibly boosted value and whether a boost was applied.
    ///
    /// An inverted or non-finite boost range disables the step.
    pub fn apply(&mut self, value: f64) -> (f64, bool) {
        if !self.config.enabled || self.config.probability.is_nan() || self.config.probability <= 0.0 {
            return (value, false);
        }
        let (min, max) = (self.config.min_boost, self.config.max_boost);
        if !(min.is_finite() && max.is_finite() && min <= max) {
            warn!(min_boost = min, max_boost = max, "invalid outlier boost range, skipping");
            return (value, false);
        }
        if self.rng.gen_bool(self.config.probability.min(1.0)) {
            let boost = self
                .rng
                .gen_range(min..=max);
            (value + boost, true)
        } else {
            (value, false)
        }
    }
}
