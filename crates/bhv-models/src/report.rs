//! Analysis report models.
//!
//! A [`Report`] is produced by exactly one analysis run and is never mutated
//! afterwards. Floating point values keep full precision in memory and are
//! rounded on serialization (2 decimals for seconds, 4 for probabilities).

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::action::{CoarseAction, EventKind};
use crate::utils::{round_to, ser_round2, ser_round4};

/// A `(label, probability)` pair from a classifier's top-k.
///
/// Serialized as a two-element array, probability rounded to 4 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "(String, f64)", from = "(String, f64)")]
pub struct LabelScore {
    pub label: String,
    pub prob: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, prob: f64) -> Self {
        Self {
            label: label.into(),
            prob,
        }
    }
}

impl From<LabelScore> for (String, f64) {
    fn from(score: LabelScore) -> Self {
        (score.label, round_to(score.prob, 4))
    }
}

impl From<(String, f64)> for LabelScore {
    fn from((label, prob): (String, f64)) -> Self {
        Self { label, prob }
    }
}

/// Prediction for one window of sampled frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipPrediction {
    /// First sampled frame of the window, in seconds
    #[serde(serialize_with = "ser_round2")]
    pub t_start: f64,
    /// Last sampled frame of the window, in seconds
    #[serde(serialize_with = "ser_round2")]
    pub t_end: f64,
    /// Action classifier top-k, probability descending
    #[schemars(with = "Vec<(String, f64)>")]
    pub action_topk: Vec<LabelScore>,
    /// Top-1 fine-grained action label
    pub action_top1: String,
    /// Probability of the top-1 action
    #[serde(serialize_with = "ser_round4")]
    pub action_prob: f64,
    /// Coarse bucket, `other` when below the confidence threshold
    pub coarse: CoarseAction,
    /// Argmax label of the abnormal classifier (diagnostic only)
    pub abnormal_label: String,
    /// Resolved abnormal-class probability
    #[serde(serialize_with = "ser_round4")]
    pub abnormal_prob: f64,
    /// Whether this clip passed both the threshold and the margin test
    pub abnormal_flag: bool,
}

/// A run of adjacent clips merged into one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: EventKind,
    #[serde(serialize_with = "ser_round2")]
    pub t_start: f64,
    #[serde(serialize_with = "ser_round2")]
    pub t_end: f64,
    /// Mean per-clip confidence over the run
    #[serde(serialize_with = "ser_round4")]
    pub avg_conf: f64,
}

impl Event {
    pub fn new(kind: EventKind, t_start: f64, t_end: f64, avg_conf: f64) -> Self {
        Self {
            kind,
            t_start,
            t_end,
            avg_conf,
        }
    }

    /// Event length in seconds.
    pub fn duration_sec(&self) -> f64 {
        (self.t_end - self.t_start).max(0.0)
    }
}

/// Echo of the engine configuration used for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisParams {
    pub action_model: String,
    pub abnormal_model: String,
    pub sample_fps: f64,
    pub num_frames: usize,
    pub stride: usize,
    pub action_conf_thresh: f64,
    pub repetition_targets: Vec<CoarseAction>,
    pub repetition_min_sec: f64,
    pub abnormal_prob_thresh: f64,
    pub abnormal_margin: f64,
    pub abnormal_min_consec: usize,
}

/// How many windows were planned, evaluated and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WindowStats {
    pub total: usize,
    pub evaluated: usize,
    pub skipped: usize,
}

/// Aggregate statistics over the event timeline.
///
/// Values are already rounded when the summary is computed, and maps are
/// ordered by key, so the same inputs always serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub duration_sec: f64,
    /// Total seconds per action type
    pub action_time_sec: BTreeMap<String, f64>,
    /// Share of covered time per action type, summing to 1
    pub action_time_ratio: BTreeMap<String, f64>,
    /// Up to five `(action, ratio)` pairs, ratio descending
    pub top_actions: Vec<(String, f64)>,
    pub repetition_flags_count: usize,
    pub abnormal_flags_count: usize,
}

/// Full result of analyzing one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub video_path: String,
    #[serde(serialize_with = "ser_round2")]
    pub duration_sec: f64,
    pub params: AnalysisParams,
    pub window_stats: WindowStats,
    pub clips: Vec<ClipPrediction>,
    pub action_events: Vec<Event>,
    pub repetition_flags: Vec<Event>,
    pub abnormal_flags: Vec<Event>,
    pub summary: Summary,
}

impl Report {
    /// True if any repetition or abnormal flag was raised.
    pub fn has_flags(&self) -> bool {
        !self.repetition_flags.is_empty() || !self.abnormal_flags.is_empty()
    }

    /// Pretty-printed JSON document.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
