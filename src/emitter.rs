//! Feedback and result events
//!
//! Everything the presentation layer learns about a running session goes
//! through a [`ResultEmitter`]: per-frame progress and feedback, completed
//! scans and sessions, and persistence problems. Text is rendered in the
//! emitter's locale so sinks never need the message catalog.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::exercise::summary::ExerciseSummary;
use crate::exercise::types::FrameReport;
use crate::ppg::scan::ScanFrameReport;
use crate::session::SessionId;
use crate::types::{Indicator, Locale, VitalsEstimate};

/// One event on the side channel to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ScanProgress {
        user_id: String,
        report: ScanFrameReport,
    },
    ScanCompleted {
        user_id: String,
        estimate: VitalsEstimate,
        label: String,
        rationale: String,
        indicator: Indicator,
    },
    /// Too few covered samples; the same session may scan again
    ScanInsufficient {
        user_id: String,
        captured: usize,
        required: usize,
    },
    ExerciseFrame {
        session_id: SessionId,
        report: FrameReport,
        message: String,
    },
    RepetitionCompleted {
        session_id: SessionId,
        repetitions: u32,
    },
    SessionCompleted {
        summary: ExerciseSummary,
    },
    PersistenceFailed {
        user_id: String,
        reason: String,
    },
}

/// Receiver of engine events
pub trait EventSink {
    fn emit(&mut self, event: EngineEvent);
}

/// Collects events in memory
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EngineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }
}

impl EventSink for Sender<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) {
        if self.send(event).is_err() {
            warn!("event receiver dropped");
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: EngineEvent) {}
}

/// Renders results into events for one sink
#[derive(Debug)]
pub struct ResultEmitter<E: EventSink> {
    sink: E,
    locale: Locale,
}

impl<E: EventSink> ResultEmitter<E> {
    pub fn new(sink: E, locale: Locale) -> Self {
        Self { sink, locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn into_sink(self) -> E {
        self.sink
    }

    pub fn scan_progress(&mut self, user_id: &str, report: &ScanFrameReport) {
        self.sink.emit(EngineEvent::ScanProgress {
            user_id: user_id.to_string(),
            report: report.clone(),
        });
    }

    pub fn scan_completed(&mut self, user_id: &str, estimate: &VitalsEstimate) {
        let classification = estimate.classification;
        self.sink.emit(EngineEvent::ScanCompleted {
            user_id: user_id.to_string(),
            estimate: estimate.clone(),
            label: classification.label(self.locale).to_string(),
            rationale: classification.rationale(self.locale).to_string(),
            indicator: classification.indicator(),
        });
    }

    pub fn scan_insufficient(&mut self, user_id: &str, captured: usize, required: usize) {
        self.sink.emit(EngineEvent::ScanInsufficient {
            user_id: user_id.to_string(),
            captured,
            required,
        });
    }

    /// Frame feedback, followed by a repetition event when one was counted
    pub fn exercise_frame(&mut self, session_id: SessionId, report: &FrameReport) {
        self.sink.emit(EngineEvent::ExerciseFrame {
            session_id,
            report: report.clone(),
            message: report.feedback.message(self.locale).to_string(),
        });
        if report.repetition_completed {
            self.sink.emit(EngineEvent::RepetitionCompleted {
                session_id,
                repetitions: report.repetitions,
            });
        }
    }

    pub fn session_completed(&mut self, summary: &ExerciseSummary) {
        self.sink.emit(EngineEvent::SessionCompleted {
            summary: summary.clone(),
        });
    }

    pub fn persistence_failed(&mut self, user_id: &str, reason: &str) {
        self.sink.emit(EngineEvent::PersistenceFailed {
            user_id: user_id.to_string(),
            reason: reason.to_string(),
        });
    }
}
