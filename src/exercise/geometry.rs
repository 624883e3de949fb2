//! Landmark geometry
//!
//! Derives the quantities the exercise rules compare against their
//! thresholds: knee lift (hip.y - knee.y), wrist-above-shoulder flags and the
//! hip-knee-ankle angle. A frame whose required landmarks are not confidently
//! visible is rejected before any geometry is computed.

use serde::{Deserialize, Serialize};

use crate::exercise::types::{ExerciseKind, Landmark, LandmarkFrame};

// Pose landmark indices
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// Torso and legs must be in view for every exercise
const BODY_LANDMARKS: [usize; 6] = [
    LEFT_SHOULDER,
    RIGHT_SHOULDER,
    LEFT_HIP,
    RIGHT_HIP,
    LEFT_KNEE,
    RIGHT_KNEE,
];

/// Landmarks that must be visible for `kind`
pub fn required_landmarks(kind: ExerciseKind) -> Vec<usize> {
    let mut required = BODY_LANDMARKS.to_vec();
    match kind {
        ExerciseKind::ArmCircles => required.extend([LEFT_WRIST, RIGHT_WRIST]),
        ExerciseKind::SitToStand => required.push(LEFT_ANKLE),
        ExerciseKind::Marching | ExerciseKind::KneeLifts => {}
    }
    required
}

/// A required landmark was missing or below the visibility floor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiddenLandmark {
    pub index: usize,
    pub visibility: f64,
}

/// Geometry derived from one frame for a specific exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    /// Vertical hip-to-knee displacement per side (positive = knee above hip)
    KneeLift { left: f64, right: f64 },
    /// Whether each wrist is above its shoulder
    WristHeight { left_above: bool, right_above: bool },
    /// Left hip-knee-ankle angle in degrees
    KneeAngle { degrees: f64 },
}

/// Check the visibility guard, then compute the measurement for `kind`.
pub fn measure(
    frame: &LandmarkFrame,
    kind: ExerciseKind,
    min_visibility: f64,
) -> Result<Measurement, HiddenLandmark> {
    for index in required_landmarks(kind) {
        match frame.get(index) {
            Some(lm) if lm.visibility >= min_visibility => {}
            Some(lm) => {
                return Err(HiddenLandmark {
                    index,
                    visibility: lm.visibility,
                })
            }
            None => {
                return Err(HiddenLandmark {
                    index,
                    visibility: 0.0,
                })
            }
        }
    }

    // Every index below was checked above
    let at = |index: usize| frame.landmarks[index];

    let measurement = match kind {
        ExerciseKind::Marching | ExerciseKind::KneeLifts => Measurement::KneeLift {
            left: knee_lift(&at(LEFT_HIP), &at(LEFT_KNEE)),
            right: knee_lift(&at(RIGHT_HIP), &at(RIGHT_KNEE)),
        },
        ExerciseKind::ArmCircles => Measurement::WristHeight {
            left_above: is_above(&at(LEFT_WRIST), &at(LEFT_SHOULDER)),
            right_above: is_above(&at(RIGHT_WRIST), &at(RIGHT_SHOULDER)),
        },
        ExerciseKind::SitToStand => Measurement::KneeAngle {
            degrees: joint_angle(&at(LEFT_HIP), &at(LEFT_KNEE), &at(LEFT_ANKLE)),
        },
    };
    Ok(measurement)
}

/// Vertical displacement of the knee relative to the hip
pub fn knee_lift(hip: &Landmark, knee: &Landmark) -> f64 {
    hip.y - knee.y
}

/// Image y grows downwards, so "above" means a smaller y
pub fn is_above(point: &Landmark, reference: &Landmark) -> bool {
    point.y < reference.y
}

/// Angle at `b` formed by `a-b-c`, in degrees within [0, 180]
pub fn joint_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
