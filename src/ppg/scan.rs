//! Per-frame scan accumulation
//!
//! A [`ScanSession`] classifies every incoming RGB sample and buffers the red
//! channel of covered frames only. Uncovered frames are skipped, not
//! zero-filled, so the buffer holds contact periods exclusively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::ComputeError;
use crate::ppg::detector::{progress_percent, FingerDetector};
use crate::types::{FingerState, RgbSample};

/// Lifecycle of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    Scanning,
    /// Enough covered samples were collected
    Complete,
    Stopped,
}

/// What the presentation layer sees after each camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFrameReport {
    pub frame_index: u64,
    pub finger: FingerState,
    /// Rounded red level of the frame, for on-screen diagnostics
    pub red_level: u8,
    pub buffered: usize,
    pub progress: f64,
    pub complete: bool,
}

/// Buffer and status of one scan
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub user_id: String,
    config: ScanConfig,
    detector: FingerDetector,
    buffer: Vec<f64>,
    finger: FingerState,
    status: ScanStatus,
    frames_seen: u64,
    started_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    pub fn new(user_id: &str, config: ScanConfig) -> Self {
        Self {
            user_id: user_id.to_string(),
            detector: FingerDetector::new(config.finger.clone()),
            buffer: Vec::with_capacity(config.required_samples),
            config,
            finger: FingerState::Uncovered,
            status: ScanStatus::Idle,
            frames_seen: 0,
            started_at: None,
        }
    }

    /// Begin (or begin again) collecting samples from an empty buffer
    pub fn start(&mut self) {
        self.buffer.clear();
        self.finger = FingerState::Uncovered;
        self.frames_seen = 0;
        self.status = ScanStatus::Scanning;
        self.started_at = Some(Utc::now());
        info!(user = %self.user_id, "scan started");
    }

    /// Classify one frame and buffer it if covered.
    pub fn process(&mut self, sample: &RgbSample) -> Result<ScanFrameReport, ComputeError> {
        if self.status != ScanStatus::Scanning {
            return Err(ComputeError::InvalidState(format!(
                "scan is {:?}, not scanning",
                self.status
            )));
        }

        self.frames_seen += 1;
        let readable = sample.r.is_finite() && sample.g.is_finite() && sample.b.is_finite();
        self.finger = if readable {
            self.detector.classify(sample)
        } else {
            debug!(frame = self.frames_seen, "unreadable sample skipped");
            FingerState::Uncovered
        };

        if self.finger.is_covered() {
            self.buffer.push(sample.r);
            if self.buffer.len() >= self.config.required_samples {
                self.status = ScanStatus::Complete;
                info!(
                    user = %self.user_id,
                    samples = self.buffer.len(),
                    frames = self.frames_seen,
                    "scan complete"
                );
            }
        }

        Ok(ScanFrameReport {
            frame_index: self.frames_seen,
            finger: self.finger,
            red_level: if readable {
                sample.r.round().clamp(0.0, 255.0) as u8
            } else {
                0
            },
            buffered: self.buffer.len(),
            progress: self.progress(),
            complete: self.status == ScanStatus::Complete,
        })
    }

    /// Halt collection and discard everything buffered
    pub fn stop(&mut self) {
        self.buffer.clear();
        self.finger = FingerState::Uncovered;
        self.status = ScanStatus::Stopped;
        info!(user = %self.user_id, "scan stopped");
    }

    pub fn progress(&self) -> f64 {
        progress_percent(self.buffer.len(), self.config.required_samples)
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn finger(&self) -> FingerState {
        self.finger
    }

    pub fn raw_signal(&self) -> &[f64] {
        &self.buffer
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}
