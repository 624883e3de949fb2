//! Persistence contracts
//!
//! The engine reads a user's recent estimates through [`HistoryReader`] and
//! hands finished results to a [`ResultSink`]. Storage itself belongs to the
//! host; [`MemoryStore`] implements both contracts in memory and can be
//! saved to and loaded from JSON between runs.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::exercise::summary::ExerciseSummary;
use crate::types::HistoryRecord;

/// Default number of estimates kept per user in memory
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Read side of estimate history
pub trait HistoryReader {
    /// Up to `limit` past estimates for `user_id`, most recent first
    fn recent_estimates(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ComputeError>;
}

/// Write side for completed scans and exercise sessions
pub trait ResultSink {
    fn save_estimate(
        &mut self,
        user_id: &str,
        value: f64,
        raw_signal_blob: &str,
    ) -> Result<(), ComputeError>;

    fn save_exercise_session(&mut self, summary: &ExerciseSummary) -> Result<(), ComputeError>;
}

/// Serialize a raw scan buffer for storage
pub fn encode_raw_signal(raw: &[f64]) -> Result<String, ComputeError> {
    Ok(serde_json::to_string(raw)?)
}

/// A stored estimate with its raw signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEstimate {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub raw_signal: String,
}

/// In-memory store implementing both persistence contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Per-user estimates, oldest first
    estimates: HashMap<String, VecDeque<StoredEstimate>>,
    sessions: Vec<ExerciseSummary>,
    capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MemoryStore {
    /// Create a store keeping at most `capacity` estimates per user
    pub fn new(capacity: usize) -> Self {
        Self {
            estimates: HashMap::new(),
            sessions: Vec::new(),
            capacity,
        }
    }

    /// Record an estimate with an explicit timestamp
    pub fn insert_estimate(
        &mut self,
        user_id: &str,
        value: f64,
        recorded_at: DateTime<Utc>,
        raw_signal: String,
    ) {
        let queue = self.estimates.entry(user_id.to_string()).or_default();
        queue.push_back(StoredEstimate {
            value,
            recorded_at,
            raw_signal,
        });
        while queue.len() > self.capacity {
            queue.pop_front();
        }
    }

    pub fn estimate_count(&self, user_id: &str) -> usize {
        self.estimates.get(user_id).map_or(0, VecDeque::len)
    }

    /// Saved exercise sessions for `user_id`, most recent first
    pub fn exercise_history(&self, user_id: &str) -> Vec<&ExerciseSummary> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .collect();
        sessions.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        sessions
    }

    /// Load store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl HistoryReader for MemoryStore {
    fn recent_estimates(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ComputeError> {
        let Some(queue) = self.estimates.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut records: Vec<HistoryRecord> = queue
            .iter()
            .map(|e| HistoryRecord {
                value: e.value,
                recorded_at: e.recorded_at,
            })
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records.truncate(limit);
        Ok(records)
    }
}

impl ResultSink for MemoryStore {
    fn save_estimate(
        &mut self,
        user_id: &str,
        value: f64,
        raw_signal_blob: &str,
    ) -> Result<(), ComputeError> {
        self.insert_estimate(user_id, value, Utc::now(), raw_signal_blob.to_string());
        Ok(())
    }

    fn save_exercise_session(&mut self, summary: &ExerciseSummary) -> Result<(), ComputeError> {
        self.sessions.push(summary.clone());
        Ok(())
    }
}
