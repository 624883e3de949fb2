//! End-to-end repetition counting over replayed landmark frames

use pulse_motion::config::ExerciseConfig;
use pulse_motion::emitter::{EngineEvent, EventLog};
use pulse_motion::exercise::geometry::{LEFT_ANKLE, LEFT_HIP, LEFT_KNEE};
use pulse_motion::exercise::summary::Intensity;
use pulse_motion::exercise::types::{ExercisePhase, Feedback, Landmark, LandmarkFrame};
use pulse_motion::pipeline::ExercisePipeline;
use pulse_motion::source::{FrameSource, ReplaySource};
use pulse_motion::store::MemoryStore;
use pulse_motion::synth::{standing_pose, MotionScript};
use pulse_motion::{ComputeError, ExerciseKind, ExerciseTracker};

/// Standing pose with the left knee bent to `degrees`
fn knee_angle_frame(timestamp_ms: u64, degrees: f64) -> LandmarkFrame {
    let mut landmarks = standing_pose();
    let knee = Landmark::new(0.5, 0.6, 1.0);
    landmarks[LEFT_KNEE] = knee;
    landmarks[LEFT_ANKLE] = Landmark::new(0.5, 0.9, 1.0);
    // Ankle points straight down from the knee; rotate the thigh away from it
    let theta = (90.0 - degrees).to_radians();
    landmarks[LEFT_HIP] = Landmark::new(knee.x + 0.25 * theta.cos(), knee.y + 0.25 * theta.sin(), 1.0);
    LandmarkFrame::new(timestamp_ms, landmarks)
}

fn replay(
    kind: ExerciseKind,
    frames: Vec<LandmarkFrame>,
) -> ExercisePipeline<ReplaySource<LandmarkFrame>, MemoryStore, EventLog> {
    ExercisePipeline::new(
        "alice",
        kind,
        ReplaySource::new(frames),
        MemoryStore::default(),
        EventLog::new(),
        ExerciseConfig::default(),
    )
}

#[test]
fn sit_to_stand_angle_sequence_counts_once() {
    let angles = [170.0, 170.0, 90.0, 90.0, 90.0, 170.0, 170.0];
    let frames: Vec<_> = angles
        .iter()
        .enumerate()
        .map(|(i, a)| knee_angle_frame(i as u64 * 300, *a))
        .collect();

    let mut pipeline = replay(ExerciseKind::SitToStand, frames);
    pipeline.start().unwrap();
    pipeline.run_to_end().unwrap();

    let state = pipeline.state().unwrap();
    assert_eq!(state.repetitions, 1);
    assert_eq!(state.phase, ExercisePhase::Neutral);

    let outcome = pipeline.finish().unwrap();
    assert_eq!(outcome.summary.repetitions, 1);
    assert_eq!(outcome.summary.duration_seconds, 1);
    assert!(matches!(
        pipeline.sink().events().last(),
        Some(EngineEvent::SessionCompleted { .. })
    ));
}

#[test]
fn bounce_inside_debounce_window_is_ignored() {
    let frames = vec![
        knee_angle_frame(0, 170.0),
        knee_angle_frame(100, 90.0),
        knee_angle_frame(250, 170.0),
        knee_angle_frame(400, 170.0),
    ];
    let mut pipeline = replay(ExerciseKind::SitToStand, frames);
    pipeline.start().unwrap();

    let mut feedback = Vec::new();
    while let Ok(pulse_motion::pipeline::ExerciseTick::Frame(report)) = pipeline.tick() {
        feedback.push(report.feedback);
    }

    assert_eq!(pipeline.state().unwrap().repetitions, 0);
    assert_eq!(feedback[2], Feedback::TooFast);
}

#[test]
fn occluded_frames_do_not_advance_the_machine() {
    let mut frames = MotionScript::new(ExerciseKind::KneeLifts).frames(2);
    // Hide the right hip in every frame of the first repetition
    for frame in frames.iter_mut().skip(5).take(10) {
        frame.landmarks[24].visibility = 0.2;
    }

    let mut pipeline = replay(ExerciseKind::KneeLifts, frames);
    pipeline.start().unwrap();
    pipeline.run_to_end().unwrap();

    let state = pipeline.state().unwrap().clone();
    assert_eq!(state.repetitions, 1);
    assert_eq!(state.frames_rejected, 10);

    let hidden = pipeline
        .sink()
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::ExerciseFrame { report, .. } if !report.body_visible))
        .count();
    assert_eq!(hidden, 10);
}

#[test]
fn jittered_script_still_counts_every_rep() {
    for kind in ExerciseKind::ALL {
        let frames = MotionScript::new(kind)
            .with_tempo(50, 8)
            .with_jitter(0.004, Some(17))
            .frames(10);
        let mut pipeline = replay(kind, frames);
        pipeline.start().unwrap();
        pipeline.run_to_end().unwrap();
        let outcome = pipeline.finish().unwrap();

        assert_eq!(outcome.summary.repetitions, 10, "{kind}");
        assert_eq!(outcome.summary.intensity, Intensity::Medium);
    }
}

#[test]
fn sessions_are_isolated_in_the_tracker() {
    let mut tracker = ExerciseTracker::default();
    let a = tracker.start("alice", ExerciseKind::ArmCircles);
    let b = tracker.start("bob", ExerciseKind::Marching);

    for frame in MotionScript::new(ExerciseKind::ArmCircles).frames(3) {
        tracker.process(a, &frame).unwrap();
    }
    for frame in MotionScript::new(ExerciseKind::Marching).frames(1) {
        tracker.process(b, &frame).unwrap();
    }

    assert_eq!(tracker.state(a).unwrap().repetitions, 3);
    assert_eq!(tracker.state(b).unwrap().repetitions, 1);

    tracker.finish(a).unwrap();
    assert!(matches!(
        tracker.state(a),
        Err(ComputeError::SessionNotFound(_))
    ));
    assert_eq!(tracker.active_sessions(), 1);
}

struct NoCamera;

impl FrameSource for NoCamera {
    type Frame = LandmarkFrame;

    fn open(&mut self) -> Result<(), ComputeError> {
        Err(ComputeError::SourceUnavailable("pose model failed to load".to_string()))
    }

    fn poll_frame(&mut self) -> pulse_motion::source::FramePoll<LandmarkFrame> {
        pulse_motion::source::FramePoll::Ended
    }

    fn close(&mut self) {}
}

#[test]
fn pose_provider_failure_is_reported() {
    let mut pipeline = ExercisePipeline::new(
        "alice",
        ExerciseKind::Marching,
        NoCamera,
        MemoryStore::default(),
        EventLog::new(),
        ExerciseConfig::default(),
    );
    let err = pipeline.start().unwrap_err();
    assert!(err.to_string().contains("pose model failed to load"));
    assert!(pipeline.session_id().is_none());
}
