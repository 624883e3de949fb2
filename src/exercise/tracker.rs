//! Exercise session tracking
//!
//! [`ExerciseTracker`] keeps every active exercise session in a
//! [`SessionArena`] and threads each session's own state through the
//! repetition state machine one frame at a time.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::ExerciseConfig;
use crate::error::ComputeError;
use crate::exercise::machine;
use crate::exercise::rules::{rules_for, ExerciseRules};
use crate::exercise::summary::{estimate_calories, ExerciseSummary, Intensity};
use crate::exercise::types::{
    ExerciseKind, ExerciseSessionState, Feedback, FrameReport, LandmarkFrame,
};
use crate::session::{SessionArena, SessionId};

/// One active exercise session
pub struct ExerciseSession {
    pub user_id: String,
    pub kind: ExerciseKind,
    pub state: ExerciseSessionState,
    pub started_at: DateTime<Utc>,
    rules: Box<dyn ExerciseRules>,
    first_frame_ms: Option<u64>,
    last_frame_ms: Option<u64>,
}

impl ExerciseSession {
    fn new(user_id: &str, kind: ExerciseKind, config: &ExerciseConfig) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind,
            state: ExerciseSessionState::default(),
            started_at: Utc::now(),
            rules: rules_for(kind, config),
            first_frame_ms: None,
            last_frame_ms: None,
        }
    }

    /// Seconds between the first and last frame seen
    pub fn duration_seconds(&self) -> u64 {
        match (self.first_frame_ms, self.last_frame_ms) {
            (Some(first), Some(last)) => last.saturating_sub(first) / 1000,
            _ => 0,
        }
    }

    fn process(&mut self, frame: &LandmarkFrame, config: &ExerciseConfig) -> FrameReport {
        self.first_frame_ms.get_or_insert(frame.timestamp_ms);
        self.last_frame_ms = Some(frame.timestamp_ms);
        machine::step(self.rules.as_ref(), &mut self.state, frame, config)
    }

    fn reset(&mut self) {
        self.state = ExerciseSessionState::default();
        self.started_at = Utc::now();
        self.first_frame_ms = None;
        self.last_frame_ms = None;
    }
}

/// Arena of exercise sessions sharing one configuration
pub struct ExerciseTracker {
    config: ExerciseConfig,
    sessions: SessionArena<ExerciseSession>,
}

impl Default for ExerciseTracker {
    fn default() -> Self {
        Self::new(ExerciseConfig::default())
    }
}

impl ExerciseTracker {
    /// Tracker with the given thresholds. Inverted thresholds are not
    /// rejected here; see [`EngineConfig::validate`](crate::config::EngineConfig::validate).
    pub fn new(config: ExerciseConfig) -> Self {
        Self {
            config,
            sessions: SessionArena::new(),
        }
    }

    pub fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    /// Start a fresh session for `user_id`
    pub fn start(&mut self, user_id: &str, kind: ExerciseKind) -> SessionId {
        let id = self
            .sessions
            .insert(ExerciseSession::new(user_id, kind, &self.config));
        info!(session = %id, exercise = %kind, "exercise session started");
        id
    }

    /// Feed one landmark frame to a session
    pub fn process(
        &mut self,
        id: SessionId,
        frame: &LandmarkFrame,
    ) -> Result<FrameReport, ComputeError> {
        let session = self.sessions.get_mut(id)?;
        Ok(session.process(frame, &self.config))
    }

    pub fn state(&self, id: SessionId) -> Result<&ExerciseSessionState, ComputeError> {
        Ok(&self.sessions.get(id)?.state)
    }

    pub fn session(&self, id: SessionId) -> Result<&ExerciseSession, ComputeError> {
        self.sessions.get(id)
    }

    /// Discard progress and begin counting again from zero
    pub fn restart(&mut self, id: SessionId) -> Result<(), ComputeError> {
        let session = self.sessions.get_mut(id)?;
        session.reset();
        session.state.feedback = Feedback::Ready;
        info!(session = %id, "exercise session restarted");
        Ok(())
    }

    /// End a session and produce its summary
    pub fn finish(&mut self, id: SessionId) -> Result<ExerciseSummary, ComputeError> {
        let session = self.sessions.remove(id)?;
        let duration_seconds = session.duration_seconds();
        let summary = ExerciseSummary {
            session_id: id,
            user_id: session.user_id,
            kind: session.kind,
            repetitions: session.state.repetitions,
            duration_seconds,
            calories: estimate_calories(&self.config.calories, duration_seconds),
            intensity: Intensity::from_repetitions(session.state.repetitions),
            frames_processed: session.state.frames_processed,
            frames_rejected: session.state.frames_rejected,
            started_at: session.started_at,
            ended_at: Utc::now(),
        };
        info!(
            session = %id,
            exercise = %summary.kind,
            repetitions = summary.repetitions,
            duration_seconds,
            "exercise session finished"
        );
        Ok(summary)
    }

    /// Drop a session without producing a summary
    pub fn discard(&mut self, id: SessionId) -> Result<(), ComputeError> {
        self.sessions.remove(id)?;
        info!(session = %id, "exercise session discarded");
        Ok(())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::geometry::{LEFT_SHOULDER, LEFT_WRIST, RIGHT_SHOULDER, RIGHT_WRIST};
    use crate::exercise::types::{ExercisePhase, Landmark};

    fn arms_frame(timestamp_ms: u64, up: bool) -> LandmarkFrame {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.9); 33];
        landmarks[LEFT_SHOULDER].y = 0.3;
        landmarks[RIGHT_SHOULDER].y = 0.3;
        let wrist_y = if up { 0.1 } else { 0.6 };
        landmarks[LEFT_WRIST].y = wrist_y;
        landmarks[RIGHT_WRIST].y = wrist_y;
        LandmarkFrame::new(timestamp_ms, landmarks)
    }

    #[test]
    fn test_sessions_count_independently() {
        let mut tracker = ExerciseTracker::default();
        let a = tracker.start("user-a", ExerciseKind::ArmCircles);
        let b = tracker.start("user-b", ExerciseKind::ArmCircles);

        tracker.process(a, &arms_frame(0, true)).unwrap();
        tracker.process(a, &arms_frame(500, false)).unwrap();
        tracker.process(b, &arms_frame(0, true)).unwrap();

        assert_eq!(tracker.state(a).unwrap().repetitions, 1);
        assert_eq!(tracker.state(b).unwrap().repetitions, 0);
        assert_eq!(tracker.state(b).unwrap().phase, ExercisePhase::Up);
    }

    #[test]
    fn test_finish_builds_summary() {
        let mut tracker = ExerciseTracker::default();
        let id = tracker.start("user-a", ExerciseKind::ArmCircles);
        let mut t = 0;
        for _ in 0..10 {
            tracker.process(id, &arms_frame(t, true)).unwrap();
            t += 3_000;
            tracker.process(id, &arms_frame(t, false)).unwrap();
            t += 3_000;
        }

        let summary = tracker.finish(id).unwrap();
        assert_eq!(summary.repetitions, 10);
        assert_eq!(summary.intensity, Intensity::Medium);
        assert_eq!(summary.duration_seconds, 57);
        assert!(summary.calories > 0.0);
        assert_eq!(tracker.active_sessions(), 0);
        assert!(tracker.finish(id).is_err());
    }

    #[test]
    fn test_restart_resets_counter() {
        let mut tracker = ExerciseTracker::default();
        let id = tracker.start("user-a", ExerciseKind::ArmCircles);
        tracker.process(id, &arms_frame(0, true)).unwrap();
        tracker.process(id, &arms_frame(400, false)).unwrap();
        assert_eq!(tracker.state(id).unwrap().repetitions, 1);

        tracker.restart(id).unwrap();
        let state = tracker.state(id).unwrap();
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.phase, ExercisePhase::Neutral);
        assert_eq!(state.feedback, Feedback::Ready);
    }
}
