//! Per-exercise transition predicates
//!
//! Each variant decides, from one frame's [`Measurement`], whether a neutral
//! body is entering the active phase and whether an active body has
//! completed the movement. Timing and counting live in the state machine.

use crate::config::{ExerciseConfig, KneeAngleThresholds, LiftThresholds};
use crate::exercise::geometry::Measurement;
use crate::exercise::types::{ExerciseKind, ExercisePhase, Feedback};

/// Decision taken while the session is neutral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralDecision {
    /// Move into the active phase
    Enter(Feedback),
    /// Stay neutral with a coaching hint
    Wait(Feedback),
}

/// Decision taken while the session is in its active phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveDecision {
    /// The movement returned to its rest position
    Complete,
    /// Still mid-movement; optionally refresh the hint
    Continue(Option<Feedback>),
}

/// Geometric predicates for one exercise variant
pub trait ExerciseRules: Send {
    fn kind(&self) -> ExerciseKind;

    /// Phase entered when the movement starts
    fn active_phase(&self) -> ExercisePhase {
        ExercisePhase::Up
    }

    fn on_neutral(&self, measurement: &Measurement) -> NeutralDecision;

    fn on_active(&self, measurement: &Measurement) -> ActiveDecision;
}

/// Build the rules for `kind` from the configured thresholds.
pub fn rules_for(kind: ExerciseKind, config: &ExerciseConfig) -> Box<dyn ExerciseRules> {
    match kind {
        ExerciseKind::Marching => Box::new(MarchingRules {
            thresholds: config.marching.clone(),
        }),
        ExerciseKind::KneeLifts => Box::new(KneeLiftRules {
            thresholds: config.knee_lift.clone(),
        }),
        ExerciseKind::ArmCircles => Box::new(ArmCircleRules),
        ExerciseKind::SitToStand => Box::new(SitToStandRules {
            thresholds: config.sit_to_stand.clone(),
        }),
    }
}

/// Marching in place: a shallow lift of either knee starts a step, both
/// knees settling well below the hip finish it.
#[derive(Debug, Clone)]
pub struct MarchingRules {
    pub thresholds: LiftThresholds,
}

impl ExerciseRules for MarchingRules {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Marching
    }

    fn on_neutral(&self, measurement: &Measurement) -> NeutralDecision {
        match measurement {
            Measurement::KneeLift { left, right }
                if *left > self.thresholds.raise || *right > self.thresholds.raise =>
            {
                NeutralDecision::Enter(Feedback::KeepMarching)
            }
            _ => NeutralDecision::Wait(Feedback::MarchInPlace),
        }
    }

    fn on_active(&self, measurement: &Measurement) -> ActiveDecision {
        match measurement {
            Measurement::KneeLift { left, right }
                if *left < self.thresholds.lower && *right < self.thresholds.lower =>
            {
                ActiveDecision::Complete
            }
            _ => ActiveDecision::Continue(None),
        }
    }
}

/// High knee lifts: either knee rising towards hip height starts the
/// repetition, both feet back near the ground finish it.
#[derive(Debug, Clone)]
pub struct KneeLiftRules {
    pub thresholds: LiftThresholds,
}

impl ExerciseRules for KneeLiftRules {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::KneeLifts
    }

    fn on_neutral(&self, measurement: &Measurement) -> NeutralDecision {
        match measurement {
            Measurement::KneeLift { left, right }
                if *left > self.thresholds.raise || *right > self.thresholds.raise =>
            {
                NeutralDecision::Enter(Feedback::HoldKnee)
            }
            _ => NeutralDecision::Wait(Feedback::RaiseKnee),
        }
    }

    fn on_active(&self, measurement: &Measurement) -> ActiveDecision {
        match measurement {
            Measurement::KneeLift { left, right }
                if *left < self.thresholds.lower && *right < self.thresholds.lower =>
            {
                ActiveDecision::Complete
            }
            _ => ActiveDecision::Continue(None),
        }
    }
}

/// Arm circles: both wrists above the shoulders, then both below.
#[derive(Debug, Clone, Default)]
pub struct ArmCircleRules;

impl ExerciseRules for ArmCircleRules {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::ArmCircles
    }

    fn on_neutral(&self, measurement: &Measurement) -> NeutralDecision {
        match measurement {
            Measurement::WristHeight {
                left_above: true,
                right_above: true,
            } => NeutralDecision::Enter(Feedback::CircleUp),
            Measurement::WristHeight {
                left_above,
                right_above,
            } if *left_above || *right_above => NeutralDecision::Wait(Feedback::RaiseBothArms),
            _ => NeutralDecision::Wait(Feedback::StartArmCircles),
        }
    }

    fn on_active(&self, measurement: &Measurement) -> ActiveDecision {
        match measurement {
            Measurement::WristHeight {
                left_above: false,
                right_above: false,
            } => ActiveDecision::Complete,
            _ => ActiveDecision::Continue(None),
        }
    }
}

/// Sit-to-stand: the knee bending past the sitting angle starts the
/// repetition, straightening past the standing angle finishes it.
#[derive(Debug, Clone)]
pub struct SitToStandRules {
    pub thresholds: KneeAngleThresholds,
}

impl ExerciseRules for SitToStandRules {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::SitToStand
    }

    fn active_phase(&self) -> ExercisePhase {
        ExercisePhase::Down
    }

    fn on_neutral(&self, measurement: &Measurement) -> NeutralDecision {
        match measurement {
            Measurement::KneeAngle { degrees } if *degrees < self.thresholds.sit_below => {
                NeutralDecision::Enter(Feedback::StandUpSlowly)
            }
            _ => NeutralDecision::Wait(Feedback::SitDown),
        }
    }

    fn on_active(&self, measurement: &Measurement) -> ActiveDecision {
        match measurement {
            Measurement::KneeAngle { degrees } if *degrees > self.thresholds.stand_above => {
                ActiveDecision::Complete
            }
            _ => ActiveDecision::Continue(Some(Feedback::StandUpStraight)),
        }
    }
}
