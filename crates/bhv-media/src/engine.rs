//! Behavior analysis orchestrator.
//!
//! One call to [`BehaviorEngine::analyze`] reads metadata, plans windows,
//! classifies each window with both classifiers over the same frames, and
//! reduces the clip predictions into a [`Report`]. Windows are processed one
//! at a time in order; a window is either fully evaluated or skipped.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use bhv_models::{LabelScore, Report};

use crate::classifier::{ClassDistribution, ClipClassifier, DecodedFrame, TOP_K};
use crate::config::EngineConfig;
use crate::error::{MediaError, MediaResult};
use crate::evaluator::ClipEvaluator;
use crate::frame_source::FrameSource;
use crate::metrics::{self, SkipReason};
use crate::report::{analysis_params, ReportBuilder};
use crate::sampler::{make_windows, sample_indices};
use crate::stream::{open_stream, VideoStream};

/// Runs the full analysis pipeline for one video at a time.
///
/// Classifier handles are shared read-only, so several engines may use the
/// same loaded models.
pub struct BehaviorEngine {
    config: EngineConfig,
    evaluator: ClipEvaluator,
    action: Arc<dyn ClipClassifier>,
    abnormal: Arc<dyn ClipClassifier>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl BehaviorEngine {
    /// Create an engine, rejecting invalid configuration before any I/O.
    pub fn new(
        config: EngineConfig,
        action: Arc<dyn ClipClassifier>,
        abnormal: Arc<dyn ClipClassifier>,
    ) -> MediaResult<Self> {
        config.validate_config()?;
        Ok(Self {
            evaluator: ClipEvaluator::new(&config),
            config,
            action,
            abnormal,
            cancel_rx: None,
        })
    }

    /// Set cancellation signal, checked before each window.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a video file and optionally persist the report as JSON.
    ///
    /// A missing file fails immediately. When the report cannot be written
    /// the error is returned; callers that need the report regardless should
    /// pass `None` and call [`ReportBuilder::write_json`] themselves.
    pub async fn analyze(
        &self,
        video_path: impl AsRef<Path>,
        save_json: Option<&Path>,
    ) -> MediaResult<Report> {
        let path = video_path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let display_path = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();

        let stream = open_stream(path).await?;
        let report = self.analyze_stream(display_path, stream).await?;

        if let Some(target) = save_json {
            ReportBuilder::write_json(&report, target).await?;
        }
        Ok(report)
    }

    /// Analyze an already opened stream.
    pub async fn analyze_stream<S: VideoStream>(
        &self,
        video_path: impl Into<String>,
        stream: S,
    ) -> MediaResult<Report> {
        let started = Instant::now();
        let video_path = video_path.into();
        let num_frames = self.config.num_frames;

        let mut source = FrameSource::new(stream);
        let meta = source.meta();
        let indices = sample_indices(meta.fps, meta.frame_count, self.config.sample_fps);
        let windows = make_windows(&indices, num_frames, self.config.stride);

        info!(
            video = %video_path,
            fps = meta.fps,
            frames = meta.frame_count,
            sampled = indices.len(),
            windows = windows.len(),
            "Starting behavior analysis"
        );

        let params = analysis_params(&self.config, self.action.name(), self.abnormal.name());
        let mut builder =
            ReportBuilder::new(video_path, meta, params).with_total_windows(windows.len());

        for (i, window) in windows.iter().enumerate() {
            self.check_cancelled()?;

            let frames = source.frames_for(window).await?;
            if frames.len() != num_frames {
                debug!(window = i, decoded = frames.len(), "Skipping short window");
                metrics::record_window_skipped(SkipReason::ShortWindow);
                builder.record_skip();
            } else {
                match self.classify(&frames).await {
                    Ok((action_topk, abnormal)) => {
                        let t_start = meta.time_of(window[0]);
                        let t_end = meta.time_of(window[window.len() - 1]);
                        let clip = self.evaluator.evaluate(t_start, t_end, action_topk, &abnormal);
                        debug!(
                            window = i,
                            coarse = %clip.coarse,
                            action_prob = clip.action_prob,
                            abnormal_prob = clip.abnormal_prob,
                            abnormal_flag = clip.abnormal_flag,
                            "Window evaluated"
                        );
                        metrics::record_window_evaluated();
                        builder.push_clip(clip);
                    }
                    Err(e) => {
                        warn!(window = i, error = %e, "Classifier failed, skipping window");
                        metrics::record_window_skipped(SkipReason::ClassifierError);
                        builder.record_skip();
                    }
                }
            }

            if let Some(next) = windows.get(i + 1) {
                source.evict_before(next[0]);
            }
        }

        let report = builder.build(&self.config);
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_analysis_duration(elapsed);

        let stats = source.stats();
        info!(
            evaluated = report.window_stats.evaluated,
            skipped = report.window_stats.skipped,
            frames_decoded = stats.decoded,
            seeks = stats.seeks,
            action_events = report.action_events.len(),
            repetition_flags = report.repetition_flags.len(),
            abnormal_flags = report.abnormal_flags.len(),
            elapsed_secs = elapsed,
            "Behavior analysis complete"
        );

        Ok(report)
    }

    /// Run both classifiers over the same frames.
    async fn classify(
        &self,
        frames: &[DecodedFrame],
    ) -> MediaResult<(Vec<LabelScore>, ClassDistribution)> {
        let t0 = Instant::now();
        let topk = self.action.predict_topk(frames, TOP_K).await?;
        metrics::record_classifier_latency("action", t0.elapsed().as_secs_f64());

        let t1 = Instant::now();
        let abnormal = self.abnormal.predict_full(frames).await?;
        metrics::record_classifier_latency("abnormal", t1.elapsed().as_secs_f64());

        Ok((topk, abnormal))
    }

    fn check_cancelled(&self) -> MediaResult<()> {
        if let Some(ref cancel_rx) = self.cancel_rx {
            if *cancel_rx.borrow() {
                info!("Analysis cancelled");
                return Err(MediaError::Cancelled);
            }
        }
        Ok(())
    }
}
