//! Video clip classifier capability.
//!
//! A classifier consumes an ordered window of decoded RGB frames and returns
//! a probability distribution over a fixed label vocabulary. The engine runs
//! two of them (action and abnormal) over the same frames.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;

use bhv_models::LabelScore;

use crate::error::{MediaError, MediaResult};

/// A decoded frame shared between the frame cache and both classifiers.
pub type DecodedFrame = Arc<RgbImage>;

/// Number of entries kept in an action top-k.
pub const TOP_K: usize = 5;

/// Full probability vector with its index-to-label mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
    labels: Vec<String>,
}

impl ClassDistribution {
    /// Pair a probability vector with its labels.
    ///
    /// Fails if the lengths differ or the vocabulary is empty.
    pub fn new(probs: Vec<f64>, labels: Vec<String>) -> MediaResult<Self> {
        if probs.is_empty() {
            return Err(MediaError::internal("empty class distribution"));
        }
        if probs.len() != labels.len() {
            return Err(MediaError::internal(format!(
                "distribution has {} probabilities but {} labels",
                probs.len(),
                labels.len()
            )));
        }
        Ok(Self { probs, labels })
    }

    /// Build from raw logits by applying softmax.
    pub fn from_logits(logits: &[f32], labels: Vec<String>) -> MediaResult<Self> {
        Self::new(softmax(logits), labels)
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn prob(&self, index: usize) -> Option<f64> {
        self.probs.get(index).copied()
    }

    /// Index of the most probable class; the lowest index wins ties.
    pub fn argmax(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best, best_p), (i, &p)| {
                if p > best_p {
                    (i, p)
                } else {
                    (best, best_p)
                }
            })
            .0
    }

    /// Largest probability in the vector.
    pub fn max_prob(&self) -> f64 {
        self.probs[self.argmax()]
    }

    /// The `k` most probable classes, probability descending.
    pub fn top_k(&self, k: usize) -> Vec<LabelScore> {
        let mut order: Vec<usize> = (0..self.probs.len()).collect();
        order.sort_by(|&a, &b| {
            self.probs[b]
                .partial_cmp(&self.probs[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        order
            .into_iter()
            .take(k)
            .map(|i| LabelScore::new(self.labels[i].clone(), self.probs[i]))
            .collect()
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&x| (x as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Capability: classify a window of frames.
///
/// Implementations must be deterministic for identical input and weights.
#[async_trait]
pub trait ClipClassifier: Send + Sync {
    /// Identifier echoed in the report parameters.
    fn name(&self) -> &str;

    /// Full probability vector over the label vocabulary.
    async fn predict_full(&self, frames: &[DecodedFrame]) -> MediaResult<ClassDistribution>;

    /// Top-k `(label, prob)` pairs, probability descending.
    async fn predict_topk(&self, frames: &[DecodedFrame], k: usize) -> MediaResult<Vec<LabelScore>> {
        Ok(self.predict_full(frames).await?.top_k(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);

        // Large logits must not overflow
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_k_order_and_length() {
        let dist = ClassDistribution::new(
            vec![0.1, 0.4, 0.05, 0.3, 0.1, 0.05],
            labels(&["a", "b", "c", "d", "e", "f"]),
        )
        .unwrap();
        let top = dist.top_k(TOP_K);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].label, "b");
        assert_eq!(top[1].label, "d");
        // Equal probabilities keep index order
        assert_eq!(top[2].label, "a");
        assert_eq!(top[3].label, "e");

        let small = ClassDistribution::new(vec![0.3, 0.7], labels(&["x", "y"])).unwrap();
        assert_eq!(small.top_k(TOP_K).len(), 2);
    }

    #[test]
    fn test_argmax() {
        let dist = ClassDistribution::new(vec![0.2, 0.5, 0.3], labels(&["a", "b", "c"])).unwrap();
        assert_eq!(dist.argmax(), 1);
        assert!((dist.max_prob() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(ClassDistribution::new(vec![0.5, 0.5], labels(&["a"])).is_err());
        assert!(ClassDistribution::new(vec![], vec![]).is_err());
    }
}
