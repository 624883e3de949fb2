//! PPG glucose-proxy scanning
//!
//! Pipeline: RgbSample → finger detector → scan buffer → conditioner →
//! features → prediction strategy → history blend → VitalsEstimate

pub mod conditioner;
pub mod detector;
pub mod estimator;
pub mod features;
pub mod scan;
pub mod strategy;

pub use conditioner::{SignalConditioner, SignalWindow};
pub use detector::FingerDetector;
pub use estimator::VitalsEstimator;
pub use features::SignalFeatures;
pub use scan::{ScanFrameReport, ScanSession, ScanStatus};
pub use strategy::{HeuristicStrategy, OutlierSimulation, PredictionStrategy};
