//! Threshold policy that classifies a window's delta.

use std::fmt;
use std::time::Duration;

/// Readings in a food-stall window.
pub const FOOD_STALL_CAPACITY: usize = 20;
/// A food stream alerts when it rose by at most this much over its window.
pub const FOOD_STALL_THRESHOLD: f64 = 1.0;
/// Readings in a smoker-drop window.
pub const SMOKER_DROP_CAPACITY: usize = 5;
/// The smoker alerts when it changed by at most this much (a drop of 15 or more).
pub const SMOKER_DROP_THRESHOLD: f64 = -15.0;

/// Comparison applied between the rounded delta and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Alert when `delta <= threshold`.
    AtMost,
    /// Alert when `delta >= threshold`.
    AtLeast,
}

impl Comparison {
    fn holds(self, delta: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtMost => delta <= threshold,
            Comparison::AtLeast => delta >= threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::AtMost => write!(f, "<="),
            Comparison::AtLeast => write!(f, ">="),
        }
    }
}

/// Outcome of evaluating one full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Alert,
    Normal,
}

/// Per-stream detection settings, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Number of readings the window spans.
    pub window_capacity: usize,
    pub comparison: Comparison,
    pub threshold: f64,
    /// Notification subject sent on alert.
    pub subject: String,
    /// Notification body sent on alert.
    pub body: String,
}

impl DetectorConfig {
    /// Stall detection: alert when the window rose by at most one degree.
    pub fn food_stall(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            window_capacity: FOOD_STALL_CAPACITY,
            comparison: Comparison::AtMost,
            threshold: FOOD_STALL_THRESHOLD,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Drop detection: alert when the window fell by fifteen degrees or more.
    pub fn smoker_drop(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            window_capacity: SMOKER_DROP_CAPACITY,
            comparison: Comparison::AtMost,
            threshold: SMOKER_DROP_THRESHOLD,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Wall-clock time covered by a full window when readings arrive every `interval`.
    pub fn span(&self, interval: Duration) -> Duration {
        interval * self.window_capacity as u32
    }
}

/// Stateless classifier for window deltas.
///
/// The delta is rounded to one decimal place before comparison, matching
/// the granularity of the probe readings.
///
/// ```
/// use bbq_monitor::{DetectorConfig, StallDetector, Verdict};
///
/// let detector = StallDetector::new(&DetectorConfig::smoker_drop("s", "b"));
/// assert_eq!(detector.evaluate(-15.0), Verdict::Alert);
/// assert_eq!(detector.evaluate(-14.9), Verdict::Normal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallDetector {
    comparison: Comparison,
    threshold: f64,
}

impl StallDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            comparison: config.comparison,
            threshold: config.threshold,
        }
    }

    pub fn evaluate(&self, delta: f64) -> Verdict {
        if self.comparison.holds(round_tenths(delta), self.threshold) {
            Verdict::Alert
        } else {
            Verdict::Normal
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
