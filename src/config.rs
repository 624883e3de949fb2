//! Engine configuration
//!
//! Every threshold used by the scan and exercise pipelines lives here so a
//! deployment can tune it from a JSON file without rebuilding. Defaults match
//! the values the engine has always shipped with; the exercise thresholds are
//! empirically tuned and have not been clinically validated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Nominal frame rate of camera and pose sources
pub const NOMINAL_FPS: u32 = 30;

/// Top-level configuration for both pipelines
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scan: ScanConfig,
    pub estimator: EstimatorConfig,
    pub exercise: ExerciseConfig,
}

/// PPG capture and conditioning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Length of the resampled window fed to the estimator
    pub target_window_len: usize,
    /// Minimum covered samples before a signal can be analyzed
    pub min_raw_samples: usize,
    /// Covered samples that make up a complete scan (10 s at 30 fps)
    pub required_samples: usize,
    /// Weight of the current sample in the single-pole smoothing filter
    pub smoothing_alpha: f64,
    pub finger: FingerThresholds,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target_window_len: 300,
            min_raw_samples: 50,
            required_samples: 300,
            smoothing_alpha: 0.8,
            finger: FingerThresholds::default(),
        }
    }
}

/// Color dominance thresholds for finger-presence detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerThresholds {
    /// Red must exceed green and blue by this factor
    pub red_ratio: f64,
    /// Red must exceed green and blue by this many units
    pub red_margin: f64,
    /// Red must be brighter than this
    pub min_brightness: f64,
}

impl Default for FingerThresholds {
    fn default() -> Self {
        Self {
            red_ratio: 1.2,
            red_margin: 10.0,
            min_brightness: 40.0,
        }
    }
}

/// Vitals estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub clamp_min: f64,
    pub clamp_max: f64,
    /// Physiological midpoint the heuristic strategy starts from
    pub base_value: f64,
    pub low_variance_std: f64,
    pub low_variance_correction: f64,
    pub high_mean_threshold: f64,
    pub high_mean_correction: f64,
    /// Half-width of the uniform jitter band
    pub jitter_amplitude: f64,
    /// Weight given to the mean of past readings when blending
    pub history_weight: f64,
    /// Number of past readings fetched for blending
    pub history_limit: usize,
    /// Value reported when the prediction strategy fails
    pub fallback_value: f64,
    pub outlier: OutlierConfig,
    /// Seed for the estimator's random steps; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            clamp_min: 50.0,
            clamp_max: 400.0,
            base_value: 85.0,
            low_variance_std: 5.0,
            low_variance_correction: 10.0,
            high_mean_threshold: 200.0,
            high_mean_correction: 5.0,
            jitter_amplitude: 5.0,
            history_weight: 0.4,
            history_limit: 10,
            fallback_value: 95.0,
            outlier: OutlierConfig::default(),
            seed: None,
        }
    }
}

/// Simulated elevated-reading step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub enabled: bool,
    pub probability: f64,
    pub min_boost: f64,
    pub max_boost: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probability: 0.10,
            min_boost: 50.0,
            max_boost: 70.0,
        }
    }
}

/// Exercise counting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseConfig {
    /// Minimum time between a phase change and a counted repetition
    pub debounce_ms: u64,
    /// Landmarks below this visibility reject the frame
    pub min_visibility: f64,
    pub marching: LiftThresholds,
    pub knee_lift: LiftThresholds,
    pub sit_to_stand: KneeAngleThresholds,
    pub calories: CalorieModel,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_visibility: 0.5,
            marching: LiftThresholds {
                raise: -0.15,
                lower: -0.25,
            },
            knee_lift: LiftThresholds {
                raise: 0.02,
                lower: -0.15,
            },
            sit_to_stand: KneeAngleThresholds::default(),
            calories: CalorieModel::default(),
        }
    }
}

/// Knee-lift displacement thresholds (hip.y - knee.y, normalized units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftThresholds {
    /// Either side above this enters the active phase
    pub raise: f64,
    /// Both sides below this complete the repetition
    pub lower: f64,
}

/// Knee angle thresholds in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KneeAngleThresholds {
    pub sit_below: f64,
    pub stand_above: f64,
}

impl Default for KneeAngleThresholds {
    fn default() -> Self {
        Self {
            sit_below: 100.0,
            stand_above: 160.0,
        }
    }
}

/// Parameters of the session calorie estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalorieModel {
    pub met: f64,
    pub body_weight_kg: f64,
}

impl Default for CalorieModel {
    fn default() -> Self {
        Self {
            met: 3.2,
            body_weight_kg: 65.0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ComputeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check internal consistency of all thresholds.
    pub fn validate(&self) -> Result<(), ComputeError> {
        let scan = &self.scan;
        if scan.target_window_len < 2 {
            return Err(ComputeError::invalid_config(
                "scan.target_window_len",
                "must be at least 2",
            ));
        }
        if scan.min_raw_samples < 2 {
            return Err(ComputeError::invalid_config(
                "scan.min_raw_samples",
                "must be at least 2",
            ));
        }
        if scan.required_samples < scan.min_raw_samples {
            return Err(ComputeError::invalid_config(
                "scan.required_samples",
                "must not be below scan.min_raw_samples",
            ));
        }
        if !(0.0..=1.0).contains(&scan.smoothing_alpha) {
            return Err(ComputeError::invalid_config(
                "scan.smoothing_alpha",
                "must be within [0, 1]",
            ));
        }
        if scan.finger.red_ratio < 1.0 {
            return Err(ComputeError::invalid_config(
                "scan.finger.red_ratio",
                "must be >= 1",
            ));
        }

        let est = &self.estimator;
        if est.clamp_min >= est.clamp_max {
            return Err(ComputeError::invalid_config(
                "estimator.clamp_min",
                "must be below estimator.clamp_max",
            ));
        }
        if !(0.0..=1.0).contains(&est.history_weight) {
            return Err(ComputeError::invalid_config(
                "estimator.history_weight",
                "must be within [0, 1]",
            ));
        }
        if !est.jitter_amplitude.is_finite() || est.jitter_amplitude < 0.0 {
            return Err(ComputeError::invalid_config(
                "estimator.jitter_amplitude",
                "must be finite and non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&est.outlier.probability) {
            return Err(ComputeError::invalid_config(
                "estimator.outlier.probability",
                "must be within [0, 1]",
            ));
        }
        if !est.outlier.min_boost.is_finite() || !est.outlier.max_boost.is_finite() {
            return Err(ComputeError::invalid_config(
                "estimator.outlier",
                "boost bounds must be finite",
            ));
        }
        if est.outlier.min_boost > est.outlier.max_boost {
            return Err(ComputeError::invalid_config(
                "estimator.outlier.min_boost",
                "must not exceed estimator.outlier.max_boost",
            ));
        }

        let ex = &self.exercise;
        if !(0.0..=1.0).contains(&ex.min_visibility) {
            return Err(ComputeError::invalid_config(
                "exercise.min_visibility",
                "must be within [0, 1]",
            ));
        }
        for (field, lift) in [
            ("exercise.marching", &ex.marching),
            ("exercise.knee_lift", &ex.knee_lift),
        ] {
            if lift.lower >= lift.raise {
                return Err(ComputeError::invalid_config(
                    field,
                    "lower threshold must be below raise threshold",
                ));
            }
        }
        if ex.sit_to_stand.sit_below >= ex.sit_to_stand.stand_above {
            return Err(ComputeError::invalid_config(
                "exercise.sit_to_stand",
                "sit_below must be below stand_above",
            ));
        }
        Ok(())
    }
}
