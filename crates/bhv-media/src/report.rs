//! Summary computation and report assembly.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use bhv_models::{
    round_to, AnalysisParams, ClipPrediction, Event, Report, Summary, VideoMeta, WindowStats,
};

use crate::aggregator::{abnormal_events, group_action_events, repetition_flags};
use crate::config::EngineConfig;
use crate::error::{MediaError, MediaResult};

/// Number of entries in `Summary::top_actions`.
const TOP_ACTIONS: usize = 5;

/// Guard against dividing by an empty timeline.
const MIN_TOTAL_SEC: f64 = 1e-6;

/// Aggregate statistics over the action timeline.
///
/// Seconds are rounded to 2 decimals and ratios to 4. Ratios are normalized
/// over the time covered by events, not the video duration. Top actions are
/// ordered by ratio, ties broken by action name.
pub fn summarize(
    duration_sec: f64,
    action_events: &[Event],
    repetition_flags: &[Event],
    abnormal_flags: &[Event],
) -> Summary {
    let mut per_sec: BTreeMap<String, f64> = BTreeMap::new();
    for event in action_events {
        *per_sec.entry(event.kind.to_string()).or_default() += event.duration_sec();
    }

    let total: f64 = per_sec.values().sum();
    let total = if total > 0.0 { total } else { MIN_TOTAL_SEC };

    let action_time_ratio: BTreeMap<String, f64> = per_sec
        .iter()
        .map(|(k, v)| (k.clone(), round_to(v / total, 4)))
        .collect();

    let mut top_actions: Vec<(String, f64)> = action_time_ratio
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    top_actions.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    top_actions.truncate(TOP_ACTIONS);

    Summary {
        duration_sec: round_to(duration_sec, 2),
        action_time_sec: per_sec
            .into_iter()
            .map(|(k, v)| (k, round_to(v, 2)))
            .collect(),
        action_time_ratio,
        top_actions,
        repetition_flags_count: repetition_flags.len(),
        abnormal_flags_count: abnormal_flags.len(),
    }
}

/// Echo of the configuration and classifier identifiers for a report.
pub fn analysis_params(config: &EngineConfig, action_model: &str, abnormal_model: &str) -> AnalysisParams {
    AnalysisParams {
        action_model: action_model.to_string(),
        abnormal_model: abnormal_model.to_string(),
        sample_fps: config.sample_fps,
        num_frames: config.num_frames,
        stride: config.stride,
        action_conf_thresh: config.action_conf_thresh,
        repetition_targets: config.repetition_targets.iter().copied().collect(),
        repetition_min_sec: config.repetition_min_sec,
        abnormal_prob_thresh: config.abnormal_prob_thresh,
        abnormal_margin: config.abnormal_margin,
        abnormal_min_consec: config.abnormal_min_consec,
    }
}

/// Collects clip predictions for one analysis and assembles the [`Report`].
#[derive(Debug)]
pub struct ReportBuilder {
    video_path: String,
    meta: VideoMeta,
    params: AnalysisParams,
    window_stats: WindowStats,
    clips: Vec<ClipPrediction>,
}

impl ReportBuilder {
    pub fn new(video_path: impl Into<String>, meta: VideoMeta, params: AnalysisParams) -> Self {
        Self {
            video_path: video_path.into(),
            meta,
            params,
            window_stats: WindowStats::default(),
            clips: Vec::new(),
        }
    }

    /// Set the number of planned windows.
    pub fn with_total_windows(mut self, total: usize) -> Self {
        self.window_stats.total = total;
        self
    }

    /// Append the prediction of an evaluated window.
    pub fn push_clip(&mut self, clip: ClipPrediction) {
        self.window_stats.evaluated += 1;
        self.clips.push(clip);
    }

    /// Count a window that produced no prediction.
    pub fn record_skip(&mut self) {
        self.window_stats.skipped += 1;
    }

    pub fn clips(&self) -> &[ClipPrediction] {
        &self.clips
    }

    /// Run the event aggregations and the summary, producing the report.
    pub fn build(self, config: &EngineConfig) -> Report {
        let action_events = group_action_events(&self.clips);
        let repetition_flags = repetition_flags(
            &action_events,
            &config.repetition_targets,
            config.repetition_min_sec,
        );
        let abnormal_flags = abnormal_events(&self.clips, config.abnormal_min_consec);

        let duration_sec = self.meta.duration_sec();
        let summary = summarize(duration_sec, &action_events, &repetition_flags, &abnormal_flags);

        debug!(
            clips = self.clips.len(),
            action_events = action_events.len(),
            repetition_flags = repetition_flags.len(),
            abnormal_flags = abnormal_flags.len(),
            "Report assembled"
        );

        Report {
            video_path: self.video_path,
            duration_sec,
            params: self.params,
            window_stats: self.window_stats,
            clips: self.clips,
            action_events,
            repetition_flags,
            abnormal_flags,
            summary,
        }
    }

    /// Persist a report as pretty JSON, creating missing parent directories.
    pub async fn write_json(report: &Report, path: impl AsRef<Path>) -> MediaResult<()> {
        let path = path.as_ref();
        let json = report.to_json_pretty()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::report_write(path, e))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| MediaError::report_write(path, e))?;

        info!(path = %path.display(), "Report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhv_models::{CoarseAction, EventKind};

    fn action(kind: CoarseAction, t_start: f64, t_end: f64) -> Event {
        Event::new(EventKind::Action(kind), t_start, t_end, 0.8)
    }

    #[test]
    fn test_summarize_ratios() {
        let events = vec![
            action(CoarseAction::Walking, 0.0, 6.0),
            action(CoarseAction::Running, 6.0, 8.0),
            action(CoarseAction::Walking, 8.0, 10.0),
        ];
        let summary = summarize(10.0, &events, &[], &[]);
        assert_eq!(summary.action_time_sec["walking"], 8.0);
        assert_eq!(summary.action_time_ratio["walking"], 0.8);
        assert_eq!(summary.action_time_ratio["running"], 0.2);
        assert_eq!(summary.top_actions[0], ("walking".to_string(), 0.8));
        assert_eq!(summary.repetition_flags_count, 0);
    }

    #[test]
    fn test_summarize_empty_timeline() {
        let summary = summarize(3.0, &[], &[], &[]);
        assert!(summary.action_time_sec.is_empty());
        assert!(summary.top_actions.is_empty());
        assert_eq!(summary.duration_sec, 3.0);
    }

    #[test]
    fn test_top_actions_ties_break_by_name() {
        let events = vec![
            action(CoarseAction::Sitting, 0.0, 2.0),
            action(CoarseAction::Lying, 2.0, 4.0),
        ];
        let summary = summarize(4.0, &events, &[], &[]);
        assert_eq!(summary.top_actions[0].0, "lying");
        assert_eq!(summary.top_actions[1].0, "sitting");
    }

    #[test]
    fn test_summarize_is_deterministic() {
        let events = vec![
            action(CoarseAction::Playing, 0.0, 3.3),
            action(CoarseAction::Standing, 3.3, 5.0),
            action(CoarseAction::Other, 5.0, 9.1),
        ];
        let a = serde_json::to_string(&summarize(9.1, &events, &[], &[])).unwrap();
        let b = serde_json::to_string(&summarize(9.1, &events, &[], &[])).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_write_json_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/report.json");

        let config = EngineConfig::default();
        let meta = VideoMeta::new(30.0, 90);
        let report = ReportBuilder::new("video.mp4", meta, analysis_params(&config, "a", "b"))
            .build(&config);

        ReportBuilder::write_json(&report, &path).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["video_path"], "video.mp4");
        assert_eq!(parsed["duration_sec"], 3.0);
        assert_eq!(parsed["params"]["abnormal_min_consec"], 10);
    }

    #[tokio::test]
    async fn test_write_json_unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("report.json");

        let config = EngineConfig::default();
        let report = ReportBuilder::new("v.mp4", VideoMeta::new(30.0, 0), analysis_params(&config, "a", "b"))
            .build(&config);

        let err = ReportBuilder::write_json(&report, &path).await.unwrap_err();
        match err {
            MediaError::ReportWrite { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
