//! End-of-session summary
//!
//! Derives the persisted session record from the final state: duration,
//! an approximate calorie burn from a MET model and a coarse intensity band.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CalorieModel;
use crate::exercise::types::ExerciseKind;

/// Coarse effort band from the repetition count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn from_repetitions(repetitions: u32) -> Self {
        if repetitions > 15 {
            Intensity::High
        } else if repetitions > 8 {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }
}

/// Completed exercise session, as emitted and persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub session_id: Uuid,
    pub user_id: String,
    pub kind: ExerciseKind,
    pub repetitions: u32,
    pub duration_seconds: u64,
    pub calories: f64,
    pub intensity: Intensity,
    pub frames_processed: u64,
    pub frames_rejected: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Approximate kilocalories burned: `MET * 3.5 * kg * minutes / 200`,
/// rounded to two decimals.
pub fn estimate_calories(model: &CalorieModel, duration_seconds: u64) -> f64 {
    let minutes = duration_seconds as f64 / 60.0;
    let kcal = model.met * 3.5 * model.body_weight_kg * minutes / 200.0;
    (kcal * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_intensity_bands() {
        assert_eq!(Intensity::from_repetitions(0), Intensity::Low);
        assert_eq!(Intensity::from_repetitions(8), Intensity::Low);
        assert_eq!(Intensity::from_repetitions(9), Intensity::Medium);
        assert_eq!(Intensity::from_repetitions(15), Intensity::Medium);
        assert_eq!(Intensity::from_repetitions(16), Intensity::High);
    }

    #[test]
    fn test_calories_for_ten_minutes() {
        // 3.2 * 3.5 * 65 * 10 / 200 = 36.4
        let kcal = estimate_calories(&CalorieModel::default(), 600);
        assert_abs_diff_eq!(kcal, 36.4, epsilon = 1e-9);
    }

    #[test]
    fn test_calories_zero_duration() {
        assert_eq!(estimate_calories(&CalorieModel::default(), 0), 0.0);
    }
}
