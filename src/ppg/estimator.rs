//! Vitals estimation
//!
//! Runs the prediction strategy on a conditioned window, pulls the result
//! towards the user's recent readings, applies the outlier simulation step,
//! then clamps and classifies. A failing strategy never aborts a scan: the
//! configured fallback value is reported instead and marked as such.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::EstimatorConfig;
use crate::error::ComputeError;
use crate::ppg::conditioner::SignalWindow;
use crate::ppg::features::SignalFeatures;
use crate::ppg::strategy::{HeuristicStrategy, OutlierSimulation, PredictionStrategy};
use crate::types::{Classification, EstimateSource, HistoryRecord, VitalsEstimate};

/// Estimator owning its prediction strategy and outlier step
pub struct VitalsEstimator {
    config: EstimatorConfig,
    strategy: Box<dyn PredictionStrategy>,
    outlier: OutlierSimulation,
}

impl VitalsEstimator {
    /// Estimator with the built-in heuristic strategy.
    ///
    /// The config is not validated here. Out-of-range draw settings never
    /// panic; they produce a fallback estimate or skip the outlier step.
    pub fn new(config: EstimatorConfig) -> Self {
        let strategy = Box::new(HeuristicStrategy::new(&config));
        Self::with_strategy(config, strategy)
    }

    /// Estimator with a custom strategy, e.g. a trained model
    pub fn with_strategy(config: EstimatorConfig, strategy: Box<dyn PredictionStrategy>) -> Self {
        let outlier = OutlierSimulation::new(config.outlier.clone(), config.seed);
        Self {
            config,
            strategy,
            outlier,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate from a conditioned window and the user's most recent readings.
    ///
    /// Only the first `history_limit` records are used.
    pub fn estimate(&mut self, window: &SignalWindow, history: &[HistoryRecord]) -> VitalsEstimate {
        let features = SignalFeatures::extract(window);
        let history = &history[..history.len().min(self.config.history_limit)];

        let (raw, source, history_used) = match self.model_estimate(&features, history) {
            Ok((value, history_used)) => (value, EstimateSource::Model, history_used),
            Err(e) => {
                warn!(
                    fallback = true,
                    error = %e,
                    strategy = self.strategy.name(),
                    "prediction failed, using fallback estimate"
                );
                (self.config.fallback_value, EstimateSource::Fallback, 0)
            }
        };

        let value = raw.round().clamp(self.config.clamp_min, self.config.clamp_max);
        let classification = Classification::from_value(value);

        info!(
            value,
            classification = classification.as_str(),
            fallback = source == EstimateSource::Fallback,
            "vitals estimate computed"
        );

        VitalsEstimate {
            value,
            classification,
            source,
            strategy: self.strategy.name().to_string(),
            history_used,
            computed_at: Utc::now(),
        }
    }

    /// Strategy output blended with history and passed through the outlier
    /// step. Returns the value and the number of history records used.
    fn model_estimate(
        &mut self,
        features: &SignalFeatures,
        history: &[HistoryRecord],
    ) -> Result<(f64, usize), ComputeError> {
        let predicted = self.predict(features)?;
        let blended = blend_with_history(predicted, history, self.config.history_weight);
        let (value, boosted) = self.outlier.apply(blended);
        let history_used = history.iter().filter(|r| r.value.is_finite()).count();
        debug!(
            predicted,
            blended,
            outlier = boosted,
            history = history_used,
            "prediction blended"
        );
        if !value.is_finite() {
            return Err(ComputeError::PredictionError(format!(
                "blended estimate is not finite: {value}"
            )));
        }
        Ok((value, history_used))
    }

    fn predict(&mut self, features: &SignalFeatures) -> Result<f64, ComputeError> {
        let value = self.strategy.predict(features)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ComputeError::PredictionError(format!(
                "strategy returned non-finite value {value}"
            )))
        }
    }
}

/// `(1 - w) * estimate + w * mean(history)`; the estimate alone without history.
///
/// Non-finite history values are skipped.
pub fn blend_with_history(estimate: f64, history: &[HistoryRecord], weight: f64) -> f64 {
    match history_mean(history) {
        Some(mean) => (1.0 - weight) * estimate + weight * mean,
        None => estimate,
    }
}

fn history_mean(history: &[HistoryRecord]) -> Option<f64> {
    let (sum, count) = history
        .iter()
        .map(|r| r.value)
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutlierConfig, ScanConfig};
    use crate::ppg::conditioner::SignalConditioner;
    use approx::assert_abs_diff_eq;

    struct FixedStrategy(f64);

    impl PredictionStrategy for FixedStrategy {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&mut self, _features: &SignalFeatures) -> Result<f64, ComputeError> {
            Ok(self.0)
        }
    }

    struct BrokenStrategy;

    impl PredictionStrategy for BrokenStrategy {
        fn name(&self) -> &str {
            "broken"
        }

        fn predict(&mut self, _features: &SignalFeatures) -> Result<f64, ComputeError> {
            Err(ComputeError::PredictionError("model not loaded".to_string()))
        }
    }

    fn quiet_config() -> EstimatorConfig {
        EstimatorConfig {
            outlier: OutlierConfig {
                enabled: false,
                ..Default::default()
            },
            seed: Some(5),
            ..Default::default()
        }
    }

    fn window() -> SignalWindow {
        let raw: Vec<f64> = (0..300)
            .map(|i| 150.0 + 2.0 * (i as f64 * 0.6).sin())
            .collect();
        SignalConditioner::condition(&raw, &ScanConfig::default()).unwrap()
    }

    fn history(values: &[f64]) -> Vec<HistoryRecord> {
        values
            .iter()
            .map(|v| HistoryRecord {
                value: *v,
                recorded_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_blend_weights() {
        let blended = blend_with_history(100.0, &history(&[150.0, 130.0]), 0.4);
        assert_abs_diff_eq!(blended, 0.6 * 100.0 + 0.4 * 140.0, epsilon = 1e-12);
        assert_eq!(blend_with_history(100.0, &[], 0.4), 100.0);
    }

    #[test]
    fn test_history_is_limited() {
        let mut estimator =
            VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(100.0)));
        let mut values = vec![100.0; 10];
        values.extend([400.0; 5]);
        let estimate = estimator.estimate(&window(), &history(&values));
        assert_eq!(estimate.history_used, 10);
        assert_eq!(estimate.value, 100.0);
    }

    #[test]
    fn test_output_is_clamped() {
        for raw in [-1e9, -3.0, 0.0, 49.4, 401.0, 1e12] {
            let mut estimator =
                VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(raw)));
            let estimate = estimator.estimate(&window(), &[]);
            assert!((50.0..=400.0).contains(&estimate.value), "raw {raw}");
        }
    }

    #[test]
    fn test_output_is_clamped_with_extreme_history() {
        let cases: [&[f64]; 6] = [
            &[1e300, 1e300],
            &[-1e9],
            &[-50.0, -80.0, -20.0],
            &[f64::MAX, f64::MAX],
            &[400.0; 10],
            &[0.0],
        ];
        for values in cases {
            let mut estimator =
                VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(100.0)));
            let estimate = estimator.estimate(&window(), &history(values));
            assert!(
                (50.0..=400.0).contains(&estimate.value),
                "history {values:?} gave {}",
                estimate.value
            );
        }
    }

    #[test]
    fn test_non_finite_history_is_skipped() {
        let mut estimator =
            VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(100.0)));
        let values = [f64::NAN, 150.0, f64::INFINITY, f64::NEG_INFINITY];
        let estimate = estimator.estimate(&window(), &history(&values));
        assert_eq!(estimate.source, EstimateSource::Model);
        assert_eq!(estimate.history_used, 1);
        assert_eq!(estimate.value, 120.0);

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut estimator =
                VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(100.0)));
            let estimate = estimator.estimate(&window(), &history(&[value]));
            assert_eq!(estimate.value, 100.0, "history {value}");
            assert_eq!(estimate.history_used, 0);
            assert_eq!(estimate.classification, Classification::NormalHealthy);
        }
    }

    #[test]
    fn test_overflowing_blend_uses_fallback() {
        // Two finite maxima overflow the mean to infinity
        let mut estimator =
            VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(f64::MAX)));
        let estimate = estimator.estimate(&window(), &history(&[f64::MAX, f64::MAX]));
        assert!(estimate.is_fallback());
        assert_eq!(estimate.value, 95.0);
    }

    #[test]
    fn test_certain_outlier_on_high_history_is_clamped() {
        let config = EstimatorConfig {
            outlier: OutlierConfig {
                enabled: true,
                probability: 1.0,
                ..Default::default()
            },
            seed: Some(9),
            ..Default::default()
        };
        for _ in 0..20 {
            let mut estimator =
                VitalsEstimator::with_strategy(config.clone(), Box::new(FixedStrategy(390.0)));
            let estimate = estimator.estimate(&window(), &history(&[400.0; 10]));
            assert_eq!(estimate.value, 400.0);
            assert_eq!(estimate.classification, Classification::High);
            assert_eq!(estimate.source, EstimateSource::Model);
        }
    }

    #[test]
    fn test_strategy_failure_uses_fallback() {
        let mut estimator = VitalsEstimator::with_strategy(quiet_config(), Box::new(BrokenStrategy));
        let estimate = estimator.estimate(&window(), &history(&[300.0]));
        assert!(estimate.is_fallback());
        assert_eq!(estimate.value, 95.0);
        assert_eq!(estimate.history_used, 0);
        assert_eq!(estimate.classification, Classification::NormalHealthy);
    }

    #[test]
    fn test_non_finite_prediction_uses_fallback() {
        let mut estimator =
            VitalsEstimator::with_strategy(quiet_config(), Box::new(FixedStrategy(f64::NAN)));
        let estimate = estimator.estimate(&window(), &[]);
        assert_eq!(estimate.source, EstimateSource::Fallback);
    }

    #[test]
    fn test_heuristic_on_normalized_window() {
        // A z-scored window always has std 1, so the low-variance correction
        // applies: 85 + 10 +/- 5.
        let mut estimator = VitalsEstimator::new(quiet_config());
        let estimate = estimator.estimate(&window(), &[]);
        assert_eq!(estimate.source, EstimateSource::Model);
        assert_eq!(estimate.strategy, "heuristic");
        assert!((90.0..=100.0).contains(&estimate.value));
    }
}
