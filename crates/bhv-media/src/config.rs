//! Engine configuration.
//!
//! The defaults reproduce the tuning the engine was calibrated with: 10 fps
//! sampling, 16-frame windows with 50% overlap, and a conservative abnormal
//! filter that needs roughly ten consecutive confident clips.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use bhv_models::CoarseAction;

use crate::error::{MediaError, MediaResult};
use crate::vocabulary::{AbnormalVocabulary, CoarseVocabulary};

/// Configuration for one behavior engine.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// Target sampling rate in frames per second.
    #[validate(range(exclusive_min = 0.0))]
    pub sample_fps: f64,

    /// Frames per classification window.
    #[validate(range(min = 1))]
    pub num_frames: usize,

    /// Offset between consecutive windows, in sampled frames.
    #[validate(range(min = 1))]
    pub stride: usize,

    /// Top-1 action probability below which the clip is bucketed as `other`.
    #[validate(range(min = 0.0, max = 1.0))]
    pub action_conf_thresh: f64,

    /// Coarse actions that raise a repetition flag when sustained.
    pub repetition_targets: BTreeSet<CoarseAction>,

    /// Minimum action event length for a repetition flag, in seconds.
    #[validate(range(min = 0.0))]
    pub repetition_min_sec: f64,

    /// Minimum abnormal-class probability for a clip to be flagged.
    #[validate(range(min = 0.0, max = 1.0))]
    pub abnormal_prob_thresh: f64,

    /// Required lead of the abnormal probability over the normal one.
    #[validate(range(min = 0.0, max = 1.0))]
    pub abnormal_margin: f64,

    /// Minimum consecutive flagged clips for an abnormal event.
    #[validate(range(min = 1))]
    pub abnormal_min_consec: usize,

    /// Fine-grained action label to coarse bucket table.
    pub coarse_vocabulary: CoarseVocabulary,

    /// Keywords identifying the abnormal and normal classes.
    pub abnormal_vocabulary: AbnormalVocabulary,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_fps: 10.0,
            num_frames: 16,
            stride: 8,
            action_conf_thresh: 0.35,
            repetition_targets: [CoarseAction::Running, CoarseAction::Jumping].into(),
            repetition_min_sec: 10.0,
            abnormal_prob_thresh: 0.70,
            abnormal_margin: 0.15,
            abnormal_min_consec: 10,
            coarse_vocabulary: CoarseVocabulary::default(),
            abnormal_vocabulary: AbnormalVocabulary::default(),
        }
    }
}

impl EngineConfig {
    /// Check every parameter, surfacing the first problem as `InvalidConfig`.
    pub fn validate_config(&self) -> MediaResult<()> {
        self.validate()
            .map_err(|e| MediaError::invalid_config(e.to_string()))
    }

    /// Builder-style setter for the sampling rate.
    pub fn with_sample_fps(mut self, fps: f64) -> Self {
        self.sample_fps = fps;
        self
    }

    /// Builder-style setter for window length and stride.
    pub fn with_window(mut self, num_frames: usize, stride: usize) -> Self {
        self.num_frames = num_frames;
        self.stride = stride;
        self
    }

    /// Builder-style setter for the action confidence threshold.
    pub fn with_action_conf_thresh(mut self, thresh: f64) -> Self {
        self.action_conf_thresh = thresh;
        self
    }

    /// Builder-style setter for repetition targets and minimum duration.
    pub fn with_repetition(
        mut self,
        targets: impl IntoIterator<Item = CoarseAction>,
        min_sec: f64,
    ) -> Self {
        self.repetition_targets = targets.into_iter().collect();
        self.repetition_min_sec = min_sec;
        self
    }

    /// Builder-style setter for the abnormal threshold, margin and run length.
    pub fn with_abnormal(mut self, prob_thresh: f64, margin: f64, min_consec: usize) -> Self {
        self.abnormal_prob_thresh = prob_thresh;
        self.abnormal_margin = margin;
        self.abnormal_min_consec = min_consec;
        self
    }

    /// Builder-style setter for the coarse action table.
    pub fn with_coarse_vocabulary(mut self, vocab: CoarseVocabulary) -> Self {
        self.coarse_vocabulary = vocab;
        self
    }

    /// Builder-style setter for the abnormal keyword sets.
    pub fn with_abnormal_vocabulary(mut self, vocab: AbnormalVocabulary) -> Self {
        self.abnormal_vocabulary = vocab;
        self
    }
}
