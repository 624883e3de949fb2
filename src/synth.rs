//! Synthetic inputs for demos and tests
//!
//! [`PulseGenerator`] produces covered-finger RGB samples with a cardiac
//! pulse on the red channel. [`MotionScript`] produces 33-point landmark
//! frames that alternate between the resting and active pose of an
//! exercise at a fixed tempo.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::NOMINAL_FPS;
use crate::exercise::geometry::{
    LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, RIGHT_ANKLE, RIGHT_HIP,
    RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};
use crate::exercise::types::{ExerciseKind, Landmark, LandmarkFrame, POSE_LANDMARK_COUNT};
use crate::types::RgbSample;

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Pulsatile PPG samples for a fingertip over the lens
pub struct PulseGenerator {
    fps: f64,
    heart_rate_bpm: f64,
    base_red: f64,
    amplitude: f64,
    noise: f64,
    frame: u64,
    rng: StdRng,
}

impl PulseGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            fps: NOMINAL_FPS as f64,
            heart_rate_bpm: 72.0,
            base_red: 180.0,
            amplitude: 3.0,
            noise: 0.5,
            frame: 0,
            rng: rng_from_seed(seed),
        }
    }

    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate_bpm = bpm;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Next covered sample
    pub fn next_sample(&mut self) -> RgbSample {
        let t = self.frame as f64 / self.fps;
        self.frame += 1;
        let pulse = (2.0 * PI * self.heart_rate_bpm / 60.0 * t).sin();
        let noise = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        RgbSample::new(self.base_red + self.amplitude * pulse + noise, 40.0, 32.0)
    }

    pub fn samples(&mut self, count: usize) -> Vec<RgbSample> {
        (0..count).map(|_| self.next_sample()).collect()
    }
}

/// A frame with nothing over the lens
pub fn uncovered_sample() -> RgbSample {
    RgbSample::new(110.0, 105.0, 100.0)
}

/// Standing pose with every landmark fully visible
pub fn standing_pose() -> Vec<Landmark> {
    let mut landmarks = vec![Landmark::new(0.5, 0.5, 1.0); POSE_LANDMARK_COUNT];
    landmarks[LEFT_SHOULDER] = Landmark::new(0.42, 0.30, 1.0);
    landmarks[RIGHT_SHOULDER] = Landmark::new(0.58, 0.30, 1.0);
    landmarks[LEFT_WRIST] = Landmark::new(0.40, 0.55, 1.0);
    landmarks[RIGHT_WRIST] = Landmark::new(0.60, 0.55, 1.0);
    landmarks[LEFT_HIP] = Landmark::new(0.45, 0.50, 1.0);
    landmarks[RIGHT_HIP] = Landmark::new(0.55, 0.50, 1.0);
    landmarks[LEFT_KNEE] = Landmark::new(0.45, 0.78, 1.0);
    landmarks[RIGHT_KNEE] = Landmark::new(0.55, 0.78, 1.0);
    landmarks[LEFT_ANKLE] = Landmark::new(0.45, 0.95, 1.0);
    landmarks[RIGHT_ANKLE] = Landmark::new(0.55, 0.95, 1.0);
    landmarks
}

/// Peak pose of one repetition of `kind`
pub fn active_pose(kind: ExerciseKind) -> Vec<Landmark> {
    let mut landmarks = standing_pose();
    match kind {
        // Knee up to a little below hip height
        ExerciseKind::Marching => landmarks[LEFT_KNEE].y = 0.62,
        ExerciseKind::KneeLifts => landmarks[LEFT_KNEE].y = 0.45,
        ExerciseKind::ArmCircles => {
            landmarks[LEFT_WRIST].y = 0.12;
            landmarks[RIGHT_WRIST].y = 0.12;
        }
        ExerciseKind::SitToStand => {
            // Thigh horizontal, shin vertical: about 90 degrees at the knee
            landmarks[LEFT_HIP] = Landmark::new(0.25, 0.72, 1.0);
            landmarks[RIGHT_HIP] = Landmark::new(0.35, 0.72, 1.0);
            landmarks[LEFT_KNEE] = Landmark::new(0.45, 0.72, 1.0);
            landmarks[RIGHT_KNEE] = Landmark::new(0.55, 0.72, 1.0);
        }
    }
    landmarks
}

/// Scripted repetitions of one exercise at a fixed tempo
pub struct MotionScript {
    kind: ExerciseKind,
    frame_interval_ms: u64,
    frames_per_phase: usize,
    jitter: f64,
    rng: StdRng,
}

impl MotionScript {
    /// 10 frames per second, half a second per phase, no jitter
    pub fn new(kind: ExerciseKind) -> Self {
        Self {
            kind,
            frame_interval_ms: 100,
            frames_per_phase: 5,
            jitter: 0.0,
            rng: rng_from_seed(Some(0)),
        }
    }

    pub fn with_tempo(mut self, frame_interval_ms: u64, frames_per_phase: usize) -> Self {
        self.frame_interval_ms = frame_interval_ms.max(1);
        self.frames_per_phase = frames_per_phase.max(1);
        self
    }

    /// Add uniform positional noise to every landmark
    pub fn with_jitter(mut self, amplitude: f64, seed: Option<u64>) -> Self {
        self.jitter = amplitude.abs();
        self.rng = rng_from_seed(seed);
        self
    }

    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    /// A resting phase, then `repetitions` active/rest cycles
    pub fn frames(&mut self, repetitions: u32) -> Vec<LandmarkFrame> {
        let rest = standing_pose();
        let active = active_pose(self.kind);
        let mut poses = Vec::new();
        poses.extend(std::iter::repeat(&rest).take(self.frames_per_phase));
        for _ in 0..repetitions {
            poses.extend(std::iter::repeat(&active).take(self.frames_per_phase));
            poses.extend(std::iter::repeat(&rest).take(self.frames_per_phase));
        }

        poses
            .into_iter()
            .enumerate()
            .map(|(i, pose)| {
                let landmarks = self.jittered(pose);
                LandmarkFrame::new(i as u64 * self.frame_interval_ms, landmarks)
            })
            .collect()
    }

    fn jittered(&mut self, pose: &[Landmark]) -> Vec<Landmark> {
        if self.jitter == 0.0 {
            return pose.to_vec();
        }
        let a = self.jitter;
        pose.iter()
            .map(|lm| {
                Landmark::new(
                    lm.x + self.rng.gen_range(-a..=a),
                    lm.y + self.rng.gen_range(-a..=a),
                    lm.visibility,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppg::detector::FingerDetector;
    use crate::types::FingerState;

    #[test]
    fn test_pulse_samples_read_as_covered() {
        let detector = FingerDetector::default();
        let mut generator = PulseGenerator::new(Some(7));
        for sample in generator.samples(120) {
            assert_eq!(detector.classify(&sample), FingerState::Covered);
        }
        assert_eq!(
            detector.classify(&uncovered_sample()),
            FingerState::Uncovered
        );
    }

    #[test]
    fn test_script_length_and_spacing() {
        let frames = MotionScript::new(ExerciseKind::Marching).frames(3);
        assert_eq!(frames.len(), 5 + 3 * 10);
        assert_eq!(frames[1].timestamp_ms - frames[0].timestamp_ms, 100);
        assert!(frames.iter().all(|f| f.landmarks.len() == POSE_LANDMARK_COUNT));
    }
}
