//! Analysis metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Windows that produced a clip prediction.
    pub const WINDOWS_EVALUATED_TOTAL: &str = "bhv_windows_evaluated_total";

    /// Windows dropped, by reason.
    pub const WINDOWS_SKIPPED_TOTAL: &str = "bhv_windows_skipped_total";

    /// Frames decoded from the stream.
    pub const FRAMES_DECODED_TOTAL: &str = "bhv_frames_decoded_total";

    /// Backward seeks issued to the stream.
    pub const SEEKS_TOTAL: &str = "bhv_stream_seeks_total";

    /// Classifier latency in seconds, by classifier role.
    pub const CLASSIFIER_LATENCY_SECONDS: &str = "bhv_classifier_latency_seconds";

    /// Wall-clock duration of a full analysis.
    pub const ANALYSIS_DURATION_SECONDS: &str = "bhv_analysis_duration_seconds";
}

/// Why a window was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer decoded frames than the window length
    ShortWindow,
    /// A classifier call failed
    ClassifierError,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortWindow => "short_window",
            Self::ClassifierError => "classifier_error",
        }
    }
}

pub fn record_window_evaluated() {
    counter!(names::WINDOWS_EVALUATED_TOTAL).increment(1);
}

pub fn record_window_skipped(reason: SkipReason) {
    let labels = [("reason", reason.as_str().to_string())];
    counter!(names::WINDOWS_SKIPPED_TOTAL, &labels).increment(1);
}

pub fn record_frame_decoded() {
    counter!(names::FRAMES_DECODED_TOTAL).increment(1);
}

pub fn record_seek() {
    counter!(names::SEEKS_TOTAL).increment(1);
}

/// Record one classifier call; `role` is `action` or `abnormal`.
pub fn record_classifier_latency(role: &str, secs: f64) {
    let labels = [("role", role.to_string())];
    histogram!(names::CLASSIFIER_LATENCY_SECONDS, &labels).record(secs);
}

pub fn record_analysis_duration(secs: f64) {
    histogram!(names::ANALYSIS_DURATION_SECONDS).record(secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::WINDOWS_SKIPPED_TOTAL.starts_with("bhv_"));
        assert!(names::CLASSIFIER_LATENCY_SECONDS.ends_with("_seconds"));
        assert_eq!(SkipReason::ShortWindow.as_str(), "short_window");
    }
}
