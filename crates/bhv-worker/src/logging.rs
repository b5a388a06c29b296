//! Structured analysis logging.
//!
//! Tags lifecycle logs of one analysis run with a generated analysis id and
//! the video path so interleaved runs can be told apart.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

use bhv_models::Report;

/// Logger for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisLogger {
    analysis_id: String,
    video: String,
}

impl AnalysisLogger {
    /// Create a logger with a fresh analysis id.
    pub fn new(video: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), video)
    }

    pub fn with_id(analysis_id: impl Into<String>, video: impl Into<String>) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            video: video.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            "Analysis started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            "Analysis progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            "Analysis warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            "Analysis error: {}", message
        );
    }

    /// Log the report summary with its headline numbers as fields.
    pub fn log_summary(&self, report: &Report) {
        let top = report
            .summary
            .top_actions
            .first()
            .map(|(action, ratio)| format!("{action} ({:.0}%)", ratio * 100.0))
            .unwrap_or_else(|| "none".to_string());

        info!(
            analysis_id = %self.analysis_id,
            video = %self.video,
            duration_sec = report.summary.duration_sec,
            windows_evaluated = report.window_stats.evaluated,
            windows_skipped = report.window_stats.skipped,
            action_events = report.action_events.len(),
            repetition_flags = report.summary.repetition_flags_count,
            abnormal_flags = report.summary.abnormal_flags_count,
            top_action = %top,
            "Analysis completed"
        );
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    /// Create a tracing span for this analysis.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "analysis",
            analysis_id = %self.analysis_id,
            video = %self.video
        )
    }
}
