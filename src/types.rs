//! Core types shared by the scan and exercise pipelines
//!
//! Frame measurements, persisted history and the immutable vitals estimate
//! produced at the end of a scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Average color over the central sampling region of one camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbSample {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl RgbSample {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// Whether a fingertip covers the camera in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerState {
    #[default]
    Uncovered,
    Covered,
}

impl FingerState {
    pub fn is_covered(&self) -> bool {
        matches!(self, FingerState::Covered)
    }
}

/// A past estimate for a user, as returned by the history collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Clinical-style band for a glucose-proxy value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Low,
    NormalHealthy,
    NormalHigh,
    Warning,
    High,
}

impl Classification {
    /// Map a value onto its band.
    ///
    /// `< 70` Low, `70..=100` NormalHealthy, `(100, 140)` NormalHigh,
    /// `[140, 200)` Warning, `>= 200` High.
    pub fn from_value(value: f64) -> Self {
        if value < 70.0 {
            Classification::Low
        } else if value <= 100.0 {
            Classification::NormalHealthy
        } else if value < 140.0 {
            Classification::NormalHigh
        } else if value < 200.0 {
            Classification::Warning
        } else {
            Classification::High
        }
    }

    /// Stable machine-readable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Low => "low",
            Classification::NormalHealthy => "normal_healthy",
            Classification::NormalHigh => "normal_high",
            Classification::Warning => "warning",
            Classification::High => "high",
        }
    }

    /// Display color associated with the band
    pub fn indicator(&self) -> Indicator {
        match self {
            Classification::Low => Indicator::Orange,
            Classification::NormalHealthy => Indicator::Green,
            Classification::NormalHigh => Indicator::Yellow,
            Classification::Warning => Indicator::Orange,
            Classification::High => Indicator::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Green,
    Yellow,
    Orange,
    Red,
}

/// Where an estimate's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Produced by the prediction strategy
    Model,
    /// Prediction failed; the configured fallback value was substituted
    Fallback,
}

/// Result of one completed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsEstimate {
    /// Clamped glucose-proxy value (mg/dL scale)
    pub value: f64,
    pub classification: Classification,
    pub source: EstimateSource,
    /// Name of the prediction strategy that produced the value
    pub strategy: String,
    /// Number of history records blended into the value
    pub history_used: usize,
    pub computed_at: DateTime<Utc>,
}

impl VitalsEstimate {
    pub fn is_fallback(&self) -> bool {
        self.source == EstimateSource::Fallback
    }
}

/// Supported message languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Id,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "id" => Ok(Locale::Id),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(Classification::from_value(69.999), Classification::Low);
        assert_eq!(Classification::from_value(70.0), Classification::NormalHealthy);
        assert_eq!(Classification::from_value(100.0), Classification::NormalHealthy);
        assert_eq!(Classification::from_value(100.001), Classification::NormalHigh);
        assert_eq!(Classification::from_value(139.999), Classification::NormalHigh);
        assert_eq!(Classification::from_value(140.0), Classification::Warning);
        assert_eq!(Classification::from_value(199.999), Classification::Warning);
        assert_eq!(Classification::from_value(200.0), Classification::High);
    }

    #[test]
    fn test_bands_are_contiguous() {
        // Sweep the whole clamp range and beyond; each value lands in exactly
        // one band and the band never moves backwards as values grow.
        let order = [
            Classification::Low,
            Classification::NormalHealthy,
            Classification::NormalHigh,
            Classification::Warning,
            Classification::High,
        ];
        let mut last = 0;
        let mut value = -50.0;
        while value <= 500.0 {
            let class = Classification::from_value(value);
            let idx = order.iter().position(|c| *c == class).unwrap();
            assert!(idx >= last, "band regressed at {value}");
            last = idx;
            value += 0.25;
        }
        assert_eq!(last, order.len() - 1);
    }

    #[test]
    fn test_indicator_colors() {
        assert_eq!(Classification::NormalHealthy.indicator(), Indicator::Green);
        assert_eq!(Classification::High.indicator(), Indicator::Red);
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("ID".parse::<Locale>().unwrap(), Locale::Id);
        assert!("fr".parse::<Locale>().is_err());
    }
}
