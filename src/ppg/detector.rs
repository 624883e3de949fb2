//! Finger-presence detection
//!
//! A fingertip pressed over the lens with the screen or flash behind it
//! shows up as a bright, strongly red frame. Requiring red dominance by
//! both a ratio and an absolute margin, plus a brightness floor, keeps
//! ambient red light from passing as contact.

use crate::config::FingerThresholds;
use crate::types::{FingerState, RgbSample};

/// Per-frame covered / uncovered classifier
#[derive(Debug, Clone, Default)]
pub struct FingerDetector {
    thresholds: FingerThresholds,
}

impl FingerDetector {
    pub fn new(thresholds: FingerThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, sample: &RgbSample) -> FingerState {
        let t = &self.thresholds;
        let red_dominant = sample.r > sample.g * t.red_ratio && sample.r > sample.b * t.red_ratio;
        let red_margin = sample.r > sample.g + t.red_margin && sample.r > sample.b + t.red_margin;
        let bright_enough = sample.r > t.min_brightness;

        if red_dominant && red_margin && bright_enough {
            FingerState::Covered
        } else {
            FingerState::Uncovered
        }
    }
}

/// Scan progress in percent, capped at 100
pub fn progress_percent(buffered: usize, required: usize) -> f64 {
    if required == 0 {
        return 100.0;
    }
    (buffered as f64 / required as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_on_lens() {
        let detector = FingerDetector::default();
        let sample = RgbSample::new(180.0, 40.0, 35.0);
        assert_eq!(detector.classify(&sample), FingerState::Covered);
    }

    #[test]
    fn test_open_camera_is_uncovered() {
        let detector = FingerDetector::default();
        assert_eq!(
            detector.classify(&RgbSample::new(120.0, 118.0, 110.0)),
            FingerState::Uncovered
        );
    }

    #[test]
    fn test_dim_red_is_uncovered() {
        // Dominant by ratio and margin but too dark
        let detector = FingerDetector::default();
        assert_eq!(
            detector.classify(&RgbSample::new(38.0, 10.0, 10.0)),
            FingerState::Uncovered
        );
    }

    #[test]
    fn test_ratio_without_margin_is_uncovered() {
        // 1.25x green but only 9 units above it
        let detector = FingerDetector::default();
        assert_eq!(
            detector.classify(&RgbSample::new(45.0, 36.0, 10.0)),
            FingerState::Uncovered
        );
    }

    #[test]
    fn test_more_red_never_uncovers() {
        let detector = FingerDetector::default();
        for g in [0.0, 20.0, 60.0, 120.0] {
            for b in [0.0, 30.0, 90.0] {
                let mut was_covered = false;
                let mut r = 0.0;
                while r <= 255.0 {
                    let covered = detector.classify(&RgbSample::new(r, g, b)).is_covered();
                    assert!(
                        !(was_covered && !covered),
                        "covered flipped off at r={r} g={g} b={b}"
                    );
                    was_covered = covered;
                    r += 1.0;
                }
            }
        }
    }

    #[test]
    fn test_progress_caps_at_hundred() {
        assert_eq!(progress_percent(0, 300), 0.0);
        assert_eq!(progress_percent(150, 300), 50.0);
        assert_eq!(progress_percent(450, 300), 100.0);
    }
}
