//! Repetition state machine
//!
//! Drives one [`ExerciseSessionState`] forward by one landmark frame. Entering
//! the active phase is committed immediately; a completion only counts when
//! at least the debounce interval has passed since the last phase change,
//! otherwise the phase drops back to neutral without counting.

use tracing::{debug, info};

use crate::config::ExerciseConfig;
use crate::exercise::geometry;
use crate::exercise::rules::{ActiveDecision, ExerciseRules, NeutralDecision};
use crate::exercise::types::{
    ExercisePhase, ExerciseSessionState, Feedback, FrameReport, LandmarkFrame,
};

/// Process one frame and return what the presentation layer should show.
pub fn step(
    rules: &dyn ExerciseRules,
    state: &mut ExerciseSessionState,
    frame: &LandmarkFrame,
    config: &ExerciseConfig,
) -> FrameReport {
    let now = frame.timestamp_ms;
    state.frames_processed += 1;

    let measurement = match geometry::measure(frame, rules.kind(), config.min_visibility) {
        Ok(m) => m,
        Err(hidden) => {
            state.frames_rejected += 1;
            state.feedback = Feedback::BodyNotVisible;
            debug!(
                exercise = %rules.kind(),
                landmark = hidden.index,
                visibility = hidden.visibility,
                "frame rejected, body not fully visible"
            );
            return report(state, now, false, false);
        }
    };

    let mut completed = false;

    match state.phase {
        ExercisePhase::Neutral => match rules.on_neutral(&measurement) {
            NeutralDecision::Enter(feedback) => {
                state.phase = rules.active_phase();
                state.last_phase_change_ms = Some(now);
                state.feedback = feedback;
                debug!(exercise = %rules.kind(), phase = ?state.phase, at_ms = now, "phase entered");
            }
            NeutralDecision::Wait(feedback) => {
                state.feedback = feedback;
            }
        },
        _ => match rules.on_active(&measurement) {
            ActiveDecision::Complete => {
                let elapsed = state
                    .last_phase_change_ms
                    .map(|changed| now.saturating_sub(changed))
                    .unwrap_or(u64::MAX);

                state.phase = ExercisePhase::Neutral;
                if elapsed >= config.debounce_ms {
                    state.repetitions += 1;
                    state.last_phase_change_ms = Some(now);
                    state.feedback = Feedback::RepCompleted;
                    completed = true;
                    info!(
                        exercise = %rules.kind(),
                        repetitions = state.repetitions,
                        "repetition completed"
                    );
                } else {
                    state.feedback = Feedback::TooFast;
                    debug!(
                        exercise = %rules.kind(),
                        elapsed_ms = elapsed,
                        "completion rejected by debounce"
                    );
                }
            }
            ActiveDecision::Continue(Some(feedback)) => {
                state.feedback = feedback;
            }
            ActiveDecision::Continue(None) => {}
        },
    }

    report(state, now, true, completed)
}

fn report(
    state: &ExerciseSessionState,
    timestamp_ms: u64,
    body_visible: bool,
    repetition_completed: bool,
) -> FrameReport {
    FrameReport {
        timestamp_ms,
        phase: state.phase,
        repetitions: state.repetitions,
        feedback: state.feedback,
        body_visible,
        repetition_completed,
    }
}
