//! Per-window evaluation.
//!
//! The action side and the abnormal side are independent pure functions over
//! the two classifier outputs for the same frames. [`ClipEvaluator`] combines
//! them with the window's time span into a [`ClipPrediction`].

use bhv_models::{ClipPrediction, CoarseAction, LabelScore};

use crate::classifier::ClassDistribution;
use crate::config::EngineConfig;
use crate::vocabulary::{AbnormalVocabulary, CoarseVocabulary, LabelSide};

/// Result of the action side of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionVerdict {
    pub top1: String,
    pub prob: f64,
    pub coarse: CoarseAction,
}

/// Top-1 of the action top-k, bucketed and confidence-gated.
///
/// An empty top-k counts as an `other` prediction with zero confidence.
pub fn evaluate_action(
    topk: &[LabelScore],
    vocab: &CoarseVocabulary,
    conf_thresh: f64,
) -> ActionVerdict {
    let Some(top) = topk.first() else {
        return ActionVerdict {
            top1: String::new(),
            prob: 0.0,
            coarse: CoarseAction::Other,
        };
    };

    let coarse = if top.prob < conf_thresh {
        CoarseAction::Other
    } else {
        vocab.classify(&top.label)
    };

    ActionVerdict {
        top1: top.label.clone(),
        prob: top.prob,
        coarse,
    }
}

/// Which indices of the abnormal vocabulary hold the abnormal and normal
/// classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbnormalIndices {
    pub abnormal: Option<usize>,
    pub normal: Option<usize>,
}

/// Resolve the abnormal and normal class indices from the labels.
///
/// The last label on each side wins. For a binary vocabulary a missing side
/// takes the other index, and with neither side resolved abnormal is 1 and
/// normal is 0.
pub fn resolve_abnormal_indices(labels: &[String], vocab: &AbnormalVocabulary) -> AbnormalIndices {
    let mut abnormal = None;
    let mut normal = None;
    for (i, label) in labels.iter().enumerate() {
        match vocab.side_of(label) {
            LabelSide::Abnormal => abnormal = Some(i),
            LabelSide::Normal => normal = Some(i),
            LabelSide::Unknown => {}
        }
    }

    if labels.len() == 2 {
        match (abnormal, normal) {
            (None, None) => {
                abnormal = Some(1);
                normal = Some(0);
            }
            (Some(a), None) => normal = Some(1 - a),
            (None, Some(n)) => abnormal = Some(1 - n),
            _ => {}
        }
    }

    AbnormalIndices { abnormal, normal }
}

/// Result of the abnormal side of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct AbnormalVerdict {
    /// Argmax label, reported for diagnostics only
    pub label: String,
    /// Resolved abnormal-class probability
    pub prob: f64,
    /// Resolved normal-class probability
    pub normal_prob: f64,
    pub flag: bool,
}

/// Threshold and margin gate for the abnormal side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbnormalGate {
    pub prob_thresh: f64,
    pub margin: f64,
}

impl AbnormalGate {
    /// A clip is flagged only when the abnormal probability reaches the
    /// threshold and beats the normal probability by at least the margin.
    pub fn passes(&self, abnormal_prob: f64, normal_prob: f64) -> bool {
        abnormal_prob >= self.prob_thresh && abnormal_prob - normal_prob >= self.margin
    }
}

/// Resolve abnormal and normal probabilities and apply the gate.
///
/// Without an abnormal index the largest probability stands in for it.
/// Without a normal index the normal probability is its complement.
pub fn evaluate_abnormal(
    dist: &ClassDistribution,
    vocab: &AbnormalVocabulary,
    gate: AbnormalGate,
) -> AbnormalVerdict {
    let indices = resolve_abnormal_indices(dist.labels(), vocab);

    let prob = indices
        .abnormal
        .and_then(|i| dist.prob(i))
        .unwrap_or_else(|| dist.max_prob());
    let normal_prob = indices
        .normal
        .and_then(|i| dist.prob(i))
        .unwrap_or(1.0 - prob);

    AbnormalVerdict {
        label: dist.label(dist.argmax()).unwrap_or_default().to_string(),
        prob,
        normal_prob,
        flag: gate.passes(prob, normal_prob),
    }
}

/// Combines both sides of a window into a [`ClipPrediction`].
#[derive(Debug, Clone)]
pub struct ClipEvaluator {
    coarse_vocab: CoarseVocabulary,
    abnormal_vocab: AbnormalVocabulary,
    action_conf_thresh: f64,
    gate: AbnormalGate,
}

impl ClipEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            coarse_vocab: config.coarse_vocabulary.clone(),
            abnormal_vocab: config.abnormal_vocabulary.clone(),
            action_conf_thresh: config.action_conf_thresh,
            gate: AbnormalGate {
                prob_thresh: config.abnormal_prob_thresh,
                margin: config.abnormal_margin,
            },
        }
    }

    pub fn evaluate(
        &self,
        t_start: f64,
        t_end: f64,
        action_topk: Vec<LabelScore>,
        abnormal: &ClassDistribution,
    ) -> ClipPrediction {
        let action = evaluate_action(&action_topk, &self.coarse_vocab, self.action_conf_thresh);
        let abnormal = evaluate_abnormal(abnormal, &self.abnormal_vocab, self.gate);

        ClipPrediction {
            t_start,
            t_end,
            action_topk,
            action_top1: action.top1,
            action_prob: action.prob,
            coarse: action.coarse,
            abnormal_label: abnormal.label,
            abnormal_prob: abnormal.prob,
            abnormal_flag: abnormal.flag,
        }
    }
}
