//! Exercise pipeline types
//!
//! Landmark frames as delivered by a pose provider, the per-session state
//! threaded through the state machine, and the per-frame report surfaced to
//! the presentation layer.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Number of points in the pose landmark schema (MediaPipe Pose)
pub const POSE_LANDMARK_COUNT: usize = 33;

/// One body point in normalized image coordinates (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Detector confidence that the point is visible (0-1)
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }
}

/// All landmarks detected in one camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture time on the source clock (milliseconds)
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(timestamp_ms: u64, landmarks: Vec<Landmark>) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }
}

/// Guided exercise variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    Marching,
    KneeLifts,
    ArmCircles,
    SitToStand,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::Marching,
        ExerciseKind::KneeLifts,
        ExerciseKind::ArmCircles,
        ExerciseKind::SitToStand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Marching => "marching",
            ExerciseKind::KneeLifts => "knee-lifts",
            ExerciseKind::ArmCircles => "arm-circles",
            ExerciseKind::SitToStand => "sit-to-stand",
        }
    }
}

impl std::fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExerciseKind {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExerciseKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ComputeError::UnsupportedExercise(s.to_string()))
    }
}

/// Movement phase of the current repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExercisePhase {
    #[default]
    Neutral,
    Up,
    /// Reserved for rules that hold a pose; no built-in rule enters it
    Hold,
    Down,
}

/// Deterministic coaching message for the current frame.
///
/// Rendering to text is done through a locale catalog, see
/// [`Feedback::message`](crate::messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Ready,
    Start,
    BodyNotVisible,
    RaiseKnee,
    HoldKnee,
    MarchInPlace,
    KeepMarching,
    StartArmCircles,
    RaiseBothArms,
    CircleUp,
    SitDown,
    StandUpSlowly,
    StandUpStraight,
    RepCompleted,
    TooFast,
}

/// Mutable state of one exercise session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSessionState {
    pub phase: ExercisePhase,
    pub repetitions: u32,
    /// Source time of the last committed phase change
    pub last_phase_change_ms: Option<u64>,
    pub feedback: Feedback,
    pub frames_processed: u64,
    /// Frames rejected because the body was not fully visible
    pub frames_rejected: u64,
}

impl Default for ExerciseSessionState {
    fn default() -> Self {
        Self {
            phase: ExercisePhase::Neutral,
            repetitions: 0,
            last_phase_change_ms: None,
            feedback: Feedback::Start,
            frames_processed: 0,
            frames_rejected: 0,
        }
    }
}

/// What the presentation layer sees after each processed landmark frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub timestamp_ms: u64,
    pub phase: ExercisePhase,
    pub repetitions: u32,
    pub feedback: Feedback,
    pub body_visible: bool,
    pub repetition_completed: bool,
}
