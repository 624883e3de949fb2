//! Pipeline orchestration
//!
//! This module provides the public API for Pulse Motion. It wires a frame
//! source, the per-frame processors, persistence and the result emitter
//! into two loops:
//!
//! - scan: RgbSample → FingerDetector → ScanSession buffer → conditioner →
//!   VitalsEstimator (with history) → ResultSink → ResultEmitter
//! - exercise: LandmarkFrame → ExerciseTracker state machine → ResultEmitter,
//!   and on finish → ExerciseSummary → ResultSink → ResultEmitter
//!
//! Each loop is driven one frame per [`tick`](ScanPipeline::tick), in arrival
//! order. Sources are acquired on start and released on stop, finish, error
//! or drop.

use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ExerciseConfig};
use crate::emitter::{EventSink, ResultEmitter};
use crate::error::ComputeError;
use crate::exercise::summary::ExerciseSummary;
use crate::exercise::tracker::ExerciseTracker;
use crate::exercise::types::{ExerciseKind, ExerciseSessionState, FrameReport};
use crate::ppg::conditioner::SignalConditioner;
use crate::ppg::estimator::VitalsEstimator;
use crate::ppg::scan::{ScanFrameReport, ScanSession, ScanStatus};
use crate::session::SessionId;
use crate::source::{AcquiredSource, FramePoll, FrameSource, PixelSampler, PoseProvider};
use crate::store::{encode_raw_signal, HistoryReader, ResultSink};
use crate::types::{HistoryRecord, Locale, VitalsEstimate};

/// Estimate from an already captured raw red-channel signal.
///
/// Stateless entry point for hosts that run their own capture loop.
///
/// # Example
/// ```ignore
/// let estimate = analyze_ppg_signal(&raw, &history, &EngineConfig::default())?;
/// println!("{} ({})", estimate.value, estimate.classification.as_str());
/// ```
pub fn analyze_ppg_signal(
    raw: &[f64],
    history: &[HistoryRecord],
    config: &EngineConfig,
) -> Result<VitalsEstimate, ComputeError> {
    let window = SignalConditioner::condition(raw, &config.scan)?;
    let mut estimator = VitalsEstimator::new(config.estimator.clone());
    Ok(estimator.estimate(&window, history))
}

/// Source either waiting to be opened or currently held open
enum SourceSlot<S: FrameSource> {
    Idle(S),
    Acquired(AcquiredSource<S>),
    /// Only observed while a transition is in progress
    Vacant,
}

impl<S: FrameSource> SourceSlot<S> {
    fn acquire(&mut self) -> Result<(), ComputeError> {
        match std::mem::replace(self, SourceSlot::Vacant) {
            SourceSlot::Idle(source) => match AcquiredSource::acquire(source) {
                Ok(acquired) => {
                    *self = SourceSlot::Acquired(acquired);
                    Ok(())
                }
                Err((source, e)) => {
                    *self = SourceSlot::Idle(source);
                    Err(e)
                }
            },
            acquired @ SourceSlot::Acquired(_) => {
                *self = acquired;
                Ok(())
            }
            SourceSlot::Vacant => Err(ComputeError::InvalidState(
                "frame source was lost".to_string(),
            )),
        }
    }

    fn release(&mut self) {
        *self = match std::mem::replace(self, SourceSlot::Vacant) {
            SourceSlot::Acquired(acquired) => SourceSlot::Idle(acquired.release()),
            other => other,
        };
    }

    fn poll(&mut self) -> Option<FramePoll<S::Frame>> {
        match self {
            SourceSlot::Acquired(acquired) => Some(acquired.poll_frame()),
            _ => None,
        }
    }

    fn is_acquired(&self) -> bool {
        matches!(self, SourceSlot::Acquired(_))
    }
}

/// Result of a completed scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub estimate: VitalsEstimate,
    /// Samples that went into the estimate
    pub samples: usize,
    /// Set when saving failed; the estimate is still valid
    pub persistence_error: Option<String>,
}

/// What one scan tick did
#[derive(Debug, Clone, PartialEq)]
pub enum ScanTick {
    Frame(ScanFrameReport),
    /// No frame available yet
    Pending,
    /// An unreadable frame was skipped
    Skipped,
    Completed(ScanOutcome),
}

/// PPG scan loop over an injected pixel sampler
pub struct ScanPipeline<S, D, E>
where
    S: PixelSampler,
    D: HistoryReader + ResultSink,
    E: EventSink,
{
    source: SourceSlot<S>,
    session: ScanSession,
    estimator: VitalsEstimator,
    store: D,
    emitter: ResultEmitter<E>,
    history_limit: usize,
}

impl<S, D, E> ScanPipeline<S, D, E>
where
    S: PixelSampler,
    D: HistoryReader + ResultSink,
    E: EventSink,
{
    /// Pipeline over an idle source. Callers building `config` in code should
    /// run [`EngineConfig::validate`] first; files and JSON are validated on load.
    pub fn new(user_id: &str, source: S, store: D, sink: E, config: &EngineConfig) -> Self {
        Self {
            source: SourceSlot::Idle(source),
            session: ScanSession::new(user_id, config.scan.clone()),
            estimator: VitalsEstimator::new(config.estimator.clone()),
            store,
            emitter: ResultEmitter::new(sink, Locale::default()),
            history_limit: config.estimator.history_limit,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.emitter = ResultEmitter::new(self.emitter.into_sink(), locale);
        self
    }

    /// Replace the estimator, e.g. to plug in a trained strategy
    pub fn with_estimator(mut self, estimator: VitalsEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Acquire the source and begin a fresh scan.
    ///
    /// Acquisition failure is fatal for this attempt and is not retried.
    pub fn start(&mut self) -> Result<(), ComputeError> {
        if let Err(e) = self.source.acquire() {
            warn!(user = %self.session.user_id, error = %e, "frame source acquisition failed");
            return Err(e);
        }
        self.session.start();
        Ok(())
    }

    /// Process at most one frame.
    pub fn tick(&mut self) -> Result<ScanTick, ComputeError> {
        if self.session.status() != ScanStatus::Scanning {
            return Err(ComputeError::InvalidState("scan is not running".to_string()));
        }
        let Some(poll) = self.source.poll() else {
            return Err(ComputeError::InvalidState(
                "frame source is not acquired".to_string(),
            ));
        };

        match poll {
            FramePoll::Ready(sample) => {
                let report = self.session.process(&sample)?;
                self.emitter.scan_progress(&self.session.user_id, &report);
                if report.complete {
                    return self.finish().map(ScanTick::Completed);
                }
                Ok(ScanTick::Frame(report))
            }
            FramePoll::Pending => Ok(ScanTick::Pending),
            FramePoll::Dropped(reason) => {
                debug!(reason = %reason, "frame dropped");
                Ok(ScanTick::Skipped)
            }
            // A source that runs dry is treated as the end of the capture window
            FramePoll::Ended => self.finish().map(ScanTick::Completed),
        }
    }

    /// Tick until the scan completes or fails.
    pub fn run(&mut self) -> Result<ScanOutcome, ComputeError> {
        loop {
            match self.tick()? {
                ScanTick::Completed(outcome) => return Ok(outcome),
                ScanTick::Pending => std::thread::yield_now(),
                ScanTick::Frame(_) | ScanTick::Skipped => {}
            }
        }
    }

    /// Estimate from what has been buffered so far and persist the result.
    ///
    /// Returns `InsufficientSignal` (retryable) when too few covered samples
    /// were collected; the buffer is discarded either way.
    pub fn finish(&mut self) -> Result<ScanOutcome, ComputeError> {
        self.source.release();
        let user_id = self.session.user_id.clone();
        let raw = self.session.raw_signal().to_vec();
        self.session.stop();

        let window = match SignalConditioner::condition(&raw, self.session.config()) {
            Ok(window) => window,
            Err(e) => {
                if let ComputeError::InsufficientSignal { captured, required } = &e {
                    warn!(user = %user_id, captured, required, "scan ended with too few samples");
                    self.emitter.scan_insufficient(&user_id, *captured, *required);
                }
                return Err(e);
            }
        };

        let history = match self.store.recent_estimates(&user_id, self.history_limit) {
            Ok(history) => history,
            Err(e) => {
                warn!(user = %user_id, error = %e, "history unavailable, estimating without it");
                Vec::new()
            }
        };

        let estimate = self.estimator.estimate(&window, &history);
        let persistence_error = self.persist(&user_id, &estimate, &raw);
        self.emitter.scan_completed(&user_id, &estimate);

        Ok(ScanOutcome {
            estimate,
            samples: raw.len(),
            persistence_error,
        })
    }

    fn persist(&mut self, user_id: &str, estimate: &VitalsEstimate, raw: &[f64]) -> Option<String> {
        let result = encode_raw_signal(raw)
            .and_then(|blob| self.store.save_estimate(user_id, estimate.value, &blob));
        match result {
            Ok(()) => None,
            Err(e) => {
                let reason = e.to_string();
                warn!(user = %user_id, error = %reason, "failed to save estimate");
                self.emitter.persistence_failed(user_id, &reason);
                Some(reason)
            }
        }
    }

    /// Halt immediately, release the source and discard buffered samples
    pub fn stop(&mut self) {
        self.source.release();
        self.session.stop();
    }

    /// Tear down and reacquire the source, starting over with an empty buffer
    pub fn restart(&mut self) -> Result<(), ComputeError> {
        self.stop();
        info!(user = %self.session.user_id, "scan restarted");
        self.start()
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn is_source_acquired(&self) -> bool {
        self.source.is_acquired()
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn sink(&self) -> &E {
        self.emitter.sink()
    }

    pub fn into_store(self) -> D {
        self.store
    }
}

/// Result of a finished exercise session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub summary: ExerciseSummary,
    pub persistence_error: Option<String>,
}

/// What one exercise tick did
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseTick {
    Frame(FrameReport),
    Pending,
    Skipped,
    /// The source has no more frames; call [`ExercisePipeline::finish`]
    Ended,
}

/// Repetition counting loop over an injected pose provider
pub struct ExercisePipeline<P, D, E>
where
    P: PoseProvider,
    D: ResultSink,
    E: EventSink,
{
    source: SourceSlot<P>,
    tracker: ExerciseTracker,
    session_id: Option<SessionId>,
    user_id: String,
    kind: ExerciseKind,
    store: D,
    emitter: ResultEmitter<E>,
}

impl<P, D, E> ExercisePipeline<P, D, E>
where
    P: PoseProvider,
    D: ResultSink,
    E: EventSink,
{
    pub fn new(
        user_id: &str,
        kind: ExerciseKind,
        source: P,
        store: D,
        sink: E,
        config: ExerciseConfig,
    ) -> Self {
        Self {
            source: SourceSlot::Idle(source),
            tracker: ExerciseTracker::new(config),
            session_id: None,
            user_id: user_id.to_string(),
            kind,
            store,
            emitter: ResultEmitter::new(sink, Locale::default()),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.emitter = ResultEmitter::new(self.emitter.into_sink(), locale);
        self
    }

    /// Acquire the pose provider and open a new session
    pub fn start(&mut self) -> Result<SessionId, ComputeError> {
        if let Err(e) = self.source.acquire() {
            warn!(user = %self.user_id, error = %e, "pose provider acquisition failed");
            return Err(e);
        }
        self.discard_session();
        let id = self.tracker.start(&self.user_id, self.kind);
        self.session_id = Some(id);
        Ok(id)
    }

    /// Process at most one landmark frame.
    pub fn tick(&mut self) -> Result<ExerciseTick, ComputeError> {
        let id = self.active_session()?;
        let Some(poll) = self.source.poll() else {
            return Err(ComputeError::InvalidState(
                "pose provider is not acquired".to_string(),
            ));
        };

        match poll {
            FramePoll::Ready(frame) => {
                let report = self.tracker.process(id, &frame)?;
                self.emitter.exercise_frame(id, &report);
                Ok(ExerciseTick::Frame(report))
            }
            FramePoll::Pending => Ok(ExerciseTick::Pending),
            FramePoll::Dropped(reason) => {
                debug!(reason = %reason, "landmark frame dropped");
                Ok(ExerciseTick::Skipped)
            }
            FramePoll::Ended => Ok(ExerciseTick::Ended),
        }
    }

    /// Tick until the source ends, returning the number of frames processed
    pub fn run_to_end(&mut self) -> Result<u64, ComputeError> {
        let mut frames = 0;
        loop {
            match self.tick()? {
                ExerciseTick::Frame(_) => frames += 1,
                ExerciseTick::Pending => std::thread::yield_now(),
                ExerciseTick::Skipped => {}
                ExerciseTick::Ended => return Ok(frames),
            }
        }
    }

    /// Release the source, summarize the session and persist it
    pub fn finish(&mut self) -> Result<SessionOutcome, ComputeError> {
        let id = self.active_session()?;
        self.source.release();
        self.session_id = None;
        let summary = self.tracker.finish(id)?;

        let persistence_error = match self.store.save_exercise_session(&summary) {
            Ok(()) => None,
            Err(e) => {
                let reason = e.to_string();
                warn!(user = %self.user_id, error = %reason, "failed to save exercise session");
                self.emitter.persistence_failed(&self.user_id, &reason);
                Some(reason)
            }
        };
        self.emitter.session_completed(&summary);

        Ok(SessionOutcome {
            summary,
            persistence_error,
        })
    }

    /// Halt immediately, release the source and drop the session unsaved
    pub fn stop(&mut self) {
        self.source.release();
        self.discard_session();
    }

    /// Tear down and reacquire the source with a fresh session
    pub fn restart(&mut self) -> Result<SessionId, ComputeError> {
        self.stop();
        info!(user = %self.user_id, exercise = %self.kind, "exercise restarted");
        self.start()
    }

    pub fn state(&self) -> Option<&ExerciseSessionState> {
        self.session_id
            .and_then(|id| self.tracker.state(id).ok())
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    pub fn is_source_acquired(&self) -> bool {
        self.source.is_acquired()
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn sink(&self) -> &E {
        self.emitter.sink()
    }

    fn active_session(&self) -> Result<SessionId, ComputeError> {
        self.session_id
            .ok_or_else(|| ComputeError::InvalidState("exercise is not running".to_string()))
    }

    fn discard_session(&mut self) {
        if let Some(id) = self.session_id.take() {
            // Only fails if the id is already gone
            let _ = self.tracker.discard(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{EngineEvent, EventLog};
    use crate::exercise::types::LandmarkFrame;
    use crate::source::ReplaySource;
    use crate::store::MemoryStore;
    use crate::synth::{uncovered_sample, MotionScript, PulseGenerator};
    use crate::types::{EstimateSource, RgbSample};
    use pretty_assertions::assert_eq;

    fn seeded_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.estimator.seed = Some(42);
        config.estimator.outlier.enabled = false;
        config
    }

    fn pulse(count: usize) -> Vec<RgbSample> {
        PulseGenerator::new(Some(1)).samples(count)
    }

    /// Store whose writes always fail
    #[derive(Default)]
    struct ReadOnlyStore;

    impl HistoryReader for ReadOnlyStore {
        fn recent_estimates(
            &self,
            _user_id: &str,
            _limit: usize,
        ) -> Result<Vec<HistoryRecord>, ComputeError> {
            Ok(Vec::new())
        }
    }

    impl ResultSink for ReadOnlyStore {
        fn save_estimate(&mut self, _: &str, _: f64, _: &str) -> Result<(), ComputeError> {
            Err(ComputeError::PersistenceError("read-only".to_string()))
        }

        fn save_exercise_session(&mut self, _: &ExerciseSummary) -> Result<(), ComputeError> {
            Err(ComputeError::PersistenceError("read-only".to_string()))
        }
    }

    struct DeniedCamera;

    impl FrameSource for DeniedCamera {
        type Frame = RgbSample;

        fn open(&mut self) -> Result<(), ComputeError> {
            Err(ComputeError::SourceUnavailable("permission denied".to_string()))
        }

        fn poll_frame(&mut self) -> FramePoll<RgbSample> {
            FramePoll::Ended
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_analyze_ppg_signal() {
        let raw: Vec<f64> = pulse(300).iter().map(|s| s.r).collect();
        let estimate = analyze_ppg_signal(&raw, &[], &seeded_config()).unwrap();
        assert_eq!(estimate.source, EstimateSource::Model);
        assert!((50.0..=400.0).contains(&estimate.value));
    }

    #[test]
    fn test_analyze_short_signal_is_retryable() {
        let err = analyze_ppg_signal(&[150.0; 10], &[], &seeded_config()).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_scan_completes_and_persists() {
        let mut frames = vec![uncovered_sample(); 20];
        frames.extend(pulse(300));
        let mut pipeline = ScanPipeline::new(
            "u1",
            ReplaySource::new(frames),
            MemoryStore::default(),
            EventLog::new(),
            &seeded_config(),
        );
        pipeline.start().unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.samples, 300);
        assert_eq!(outcome.persistence_error, None);
        assert_eq!(pipeline.store().estimate_count("u1"), 1);
        assert!(!pipeline.is_source_acquired());
        assert!(matches!(
            pipeline.sink().events().last(),
            Some(EngineEvent::ScanCompleted { .. })
        ));
    }

    #[test]
    fn test_unvalidated_estimator_config_falls_back() {
        let mut config = seeded_config();
        config.estimator.jitter_amplitude = -5.0;
        config.estimator.outlier.enabled = true;
        config.estimator.outlier.probability = 1.0;
        config.estimator.outlier.min_boost = 70.0;
        config.estimator.outlier.max_boost = 50.0;
        assert!(config.validate().is_err());

        let mut pipeline = ScanPipeline::new(
            "u1",
            ReplaySource::new(pulse(300)),
            MemoryStore::default(),
            EventLog::new(),
            &config,
        );
        pipeline.start().unwrap();
        let outcome = pipeline.run().unwrap();
        assert_eq!(outcome.estimate.source, EstimateSource::Fallback);
        assert_eq!(outcome.estimate.value, 95.0);
    }

    #[test]
    fn test_second_scan_blends_history() {
        let config = seeded_config();
        let mut store = MemoryStore::default();
        store.save_estimate("u1", 300.0, "[]").unwrap();

        let mut pipeline = ScanPipeline::new(
            "u1",
            ReplaySource::new(pulse(300)),
            store,
            EventLog::new(),
            &config,
        );
        pipeline.start().unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.estimate.history_used, 1);
        // 0.6 * (90..=100) + 0.4 * 300
        assert!((174.0..=180.0).contains(&outcome.estimate.value));
    }

    #[test]
    fn test_source_ending_early_is_insufficient() {
        let mut pipeline = ScanPipeline::new(
            "u1",
            ReplaySource::new(pulse(30)),
            MemoryStore::default(),
            EventLog::new(),
            &seeded_config(),
        );
        pipeline.start().unwrap();
        let err = pipeline.run().unwrap_err();

        assert!(matches!(
            err,
            ComputeError::InsufficientSignal {
                captured: 30,
                required: 50
            }
        ));
        assert_eq!(pipeline.store().estimate_count("u1"), 0);

        // Same session may try again
        pipeline.start().unwrap();
        assert_eq!(pipeline.session().status(), ScanStatus::Scanning);
    }

    #[test]
    fn test_denied_camera_is_fatal() {
        let mut pipeline = ScanPipeline::new(
            "u1",
            DeniedCamera,
            MemoryStore::default(),
            EventLog::new(),
            &seeded_config(),
        );
        let err = pipeline.start().unwrap_err();
        assert!(matches!(err, ComputeError::SourceUnavailable(_)));
        assert!(pipeline.tick().is_err());
    }

    #[test]
    fn test_persistence_failure_keeps_estimate() {
        let mut pipeline = ScanPipeline::new(
            "u1",
            ReplaySource::new(pulse(300)),
            ReadOnlyStore,
            EventLog::new(),
            &seeded_config(),
        );
        pipeline.start().unwrap();
        let outcome = pipeline.run().unwrap();

        assert!(outcome.persistence_error.is_some());
        assert!((50.0..=400.0).contains(&outcome.estimate.value));
        assert!(pipeline
            .sink()
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::PersistenceFailed { .. })));
    }

    #[test]
    fn test_stop_discards_and_restart_replays() {
        let mut pipeline = ScanPipeline::new(
            "u1",
            ReplaySource::new(pulse(300)),
            MemoryStore::default(),
            EventLog::new(),
            &seeded_config(),
        );
        pipeline.start().unwrap();
        for _ in 0..100 {
            pipeline.tick().unwrap();
        }
        pipeline.stop();
        assert!(pipeline.session().raw_signal().is_empty());
        assert!(pipeline.tick().is_err());

        pipeline.restart().unwrap();
        let outcome = pipeline.run().unwrap();
        assert_eq!(outcome.samples, 300);
        assert_eq!(pipeline.store().estimate_count("u1"), 1);
    }

    fn exercise_pipeline(
        kind: ExerciseKind,
        frames: Vec<LandmarkFrame>,
    ) -> ExercisePipeline<ReplaySource<LandmarkFrame>, MemoryStore, EventLog> {
        ExercisePipeline::new(
            "u1",
            kind,
            ReplaySource::new(frames),
            MemoryStore::default(),
            EventLog::new(),
            ExerciseConfig::default(),
        )
    }

    #[test]
    fn test_exercise_counts_and_saves() {
        for kind in ExerciseKind::ALL {
            let frames = MotionScript::new(kind).frames(4);
            let mut pipeline = exercise_pipeline(kind, frames);
            pipeline.start().unwrap();
            pipeline.run_to_end().unwrap();
            let outcome = pipeline.finish().unwrap();

            assert_eq!(outcome.summary.repetitions, 4, "{kind}");
            assert_eq!(outcome.persistence_error, None);
            assert_eq!(pipeline.store().exercise_history("u1").len(), 1);
        }
    }

    #[test]
    fn test_exercise_events_follow_reps() {
        let frames = MotionScript::new(ExerciseKind::ArmCircles).frames(2);
        let mut pipeline = exercise_pipeline(ExerciseKind::ArmCircles, frames);
        pipeline.start().unwrap();
        pipeline.run_to_end().unwrap();
        pipeline.finish().unwrap();

        let reps: Vec<u32> = pipeline
            .sink()
            .events()
            .iter()
            .filter_map(|e| match e {
                EngineEvent::RepetitionCompleted { repetitions, .. } => Some(*repetitions),
                _ => None,
            })
            .collect();
        assert_eq!(reps, vec![1, 2]);
    }

    #[test]
    fn test_exercise_stop_drops_session() {
        let frames = MotionScript::new(ExerciseKind::Marching).frames(3);
        let mut pipeline = exercise_pipeline(ExerciseKind::Marching, frames);
        pipeline.start().unwrap();
        for _ in 0..10 {
            pipeline.tick().unwrap();
        }
        pipeline.stop();

        assert!(pipeline.state().is_none());
        assert!(pipeline.finish().is_err());
        assert!(pipeline.store().exercise_history("u1").is_empty());

        pipeline.restart().unwrap();
        assert_eq!(pipeline.state().unwrap().repetitions, 0);
    }
}
