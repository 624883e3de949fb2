//! Pulse Motion - Real-time camera vitals and guided exercise engine
//!
//! Pulse Motion turns camera-derived frames into two kinds of results
//! through deterministic, frame-at-a-time pipelines:
//!
//! - **PPG scan**: averaged RGB samples → finger detection → signal
//!   conditioning → glucose-proxy estimate blended with recent history →
//!   classification band
//! - **Guided exercise**: pose landmark frames → geometry → per-exercise
//!   state machine with debounce → repetition count and coaching feedback
//!
//! Frame capture, pose detection and storage are injected by the host
//! through the [`source`] and [`store`] contracts.

pub mod config;
pub mod emitter;
pub mod error;
pub mod exercise;
pub mod messages;
pub mod pipeline;
pub mod ppg;
pub mod session;
pub mod source;
pub mod store;
pub mod synth;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use emitter::{EngineEvent, EventLog, EventSink, ResultEmitter};
pub use error::ComputeError;
pub use pipeline::{analyze_ppg_signal, ExercisePipeline, ScanOutcome, ScanPipeline, SessionOutcome};
pub use session::{SessionArena, SessionId};
pub use source::{FramePoll, FrameSource, PixelSampler, PoseProvider, ReplaySource};
pub use store::{HistoryReader, MemoryStore, ResultSink};

// Exercise exports
pub use exercise::{ExerciseKind, ExerciseSummary, ExerciseTracker, LandmarkFrame};

// Scan exports
pub use ppg::{ScanSession, VitalsEstimator};
pub use types::{Classification, Locale, RgbSample, VitalsEstimate};

/// Engine version recorded in diagnostics and FFI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name reported by diagnostics
pub const ENGINE_NAME: &str = "pulse-motion";
