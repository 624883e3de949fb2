//! Guided exercise repetition counting
//!
//! Consumes pose landmark frames, derives per-exercise geometry and runs a
//! small debounced state machine per session.
//!
//! Pipeline: LandmarkFrame → geometry → rules → state machine → FrameReport

pub mod geometry;
pub mod machine;
pub mod rules;
pub mod summary;
pub mod tracker;
pub mod types;

pub use rules::{rules_for, ExerciseRules};
pub use summary::{ExerciseSummary, Intensity};
pub use tracker::{ExerciseSession, ExerciseTracker};
pub use types::{
    ExerciseKind, ExercisePhase, ExerciseSessionState, Feedback, FrameReport, Landmark,
    LandmarkFrame,
};
