//! Keyword tables used to interpret classifier labels.
//!
//! Both tables are plain data so a deployment can load its own from JSON
//! without touching the evaluation code.

use serde::{Deserialize, Serialize};

use bhv_models::CoarseAction;

/// One coarse bucket and the substrings that select it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseBucket {
    pub action: CoarseAction,
    pub keywords: Vec<String>,
}

/// Ordered mapping from fine-grained action labels to coarse buckets.
///
/// Matching is case-insensitive substring containment and the first bucket
/// with a matching keyword wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CoarseBucket>", into = "Vec<CoarseBucket>")]
pub struct CoarseVocabulary {
    buckets: Vec<CoarseBucket>,
}

impl CoarseVocabulary {
    pub fn new(buckets: Vec<CoarseBucket>) -> Self {
        let buckets = buckets
            .into_iter()
            .map(|b| CoarseBucket {
                action: b.action,
                keywords: b.keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { buckets }
    }

    pub fn buckets(&self) -> &[CoarseBucket] {
        &self.buckets
    }

    /// Map a fine-grained label to its coarse bucket, `Other` if none match.
    pub fn classify(&self, label: &str) -> CoarseAction {
        let label = label.to_lowercase();
        self.buckets
            .iter()
            .find(|b| b.keywords.iter().any(|k| label.contains(k.as_str())))
            .map(|b| b.action)
            .unwrap_or(CoarseAction::Other)
    }
}

impl From<Vec<CoarseBucket>> for CoarseVocabulary {
    fn from(buckets: Vec<CoarseBucket>) -> Self {
        Self::new(buckets)
    }
}

impl From<CoarseVocabulary> for Vec<CoarseBucket> {
    fn from(vocab: CoarseVocabulary) -> Self {
        vocab.buckets
    }
}

fn bucket(action: CoarseAction, keywords: &[&str]) -> CoarseBucket {
    CoarseBucket {
        action,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

impl Default for CoarseVocabulary {
    /// Heuristic mapping tuned for Kinetics-400 label names.
    fn default() -> Self {
        Self::new(vec![
            bucket(CoarseAction::Walking, &["walk", "walking"]),
            bucket(CoarseAction::Running, &["run", "running", "jogging"]),
            bucket(CoarseAction::Sitting, &["sitting", "sit"]),
            bucket(CoarseAction::Lying, &["lying", "sleep", "sleeping", "laying"]),
            bucket(CoarseAction::Jumping, &["jump", "jumping", "hopping"]),
            bucket(CoarseAction::Standing, &["standing", "stand"]),
            bucket(
                CoarseAction::Playing,
                &[
                    "playing",
                    "clapping",
                    "throwing",
                    "catching",
                    "dancing",
                    "juggling soccer ball",
                    "kicking soccer ball",
                    "shooting goal (soccer)",
                    "dribbling basketball",
                    "robot dancing",
                    "pumping fist",
                    "skipping rope",
                    "golf putting",
                    "tossing coin",
                    "exercising arm",
                    "stretching arm",
                    "stretching leg",
                    "squat",
                    "lunge",
                    "high kick",
                    "deadlifting",
                    "front raises",
                    "jumpstyle dancing",
                ],
            ),
        ])
    }
}

/// Which side of a binary abnormal/normal decision a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSide {
    Abnormal,
    Normal,
    Unknown,
}

/// Keyword sets identifying the abnormal and normal classes of the
/// abnormal classifier's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbnormalVocabulary {
    pub abnormal: Vec<String>,
    pub normal: Vec<String>,
}

impl Default for AbnormalVocabulary {
    fn default() -> Self {
        Self {
            abnormal: ["violence", "abnormal", "fight", "assault", "aggression"]
                .into_iter()
                .map(String::from)
                .collect(),
            normal: ["non", "normal", "benign"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl AbnormalVocabulary {
    /// Decide the side of a single label.
    ///
    /// A normal keyword that only occurs inside a matched abnormal keyword
    /// ("normal" in "abnormal") is ignored. A label carrying a genuine normal
    /// keyword next to an abnormal one ("non-violence") is normal.
    pub fn side_of(&self, label: &str) -> LabelSide {
        let label = label.to_lowercase();
        let abnormal_hits: Vec<(usize, usize)> = self
            .abnormal
            .iter()
            .flat_map(|k| keyword_spans(&label, k))
            .collect();
        let normal_hit = self.normal.iter().any(|k| {
            keyword_spans(&label, k).any(|(start, end)| {
                !abnormal_hits
                    .iter()
                    .any(|&(a_start, a_end)| a_start <= start && end <= a_end)
            })
        });

        match (normal_hit, abnormal_hits.is_empty()) {
            (true, _) => LabelSide::Normal,
            (false, false) => LabelSide::Abnormal,
            (false, true) => LabelSide::Unknown,
        }
    }
}

/// Byte spans of every occurrence of `keyword` in `label`.
fn keyword_spans<'a>(label: &'a str, keyword: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
    let keyword = keyword.to_lowercase();
    let len = keyword.len();
    let starts: Vec<usize> = if len == 0 {
        Vec::new()
    } else {
        label.match_indices(keyword.as_str()).map(|(i, _)| i).collect()
    };
    starts.into_iter().map(move |start| (start, start + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coarse_mapping() {
        let vocab = CoarseVocabulary::default();
        assert_eq!(vocab.classify("Jogging"), CoarseAction::Running);
        assert_eq!(vocab.classify("walking the dog"), CoarseAction::Walking);
        assert_eq!(vocab.classify("dribbling basketball"), CoarseAction::Playing);
        assert_eq!(vocab.classify("unknown-zzz"), CoarseAction::Other);
    }

    #[test]
    fn test_first_bucket_wins() {
        let vocab = CoarseVocabulary::default();
        // "jumpstyle dancing" is in the playing list but "jump" matches first
        assert_eq!(vocab.classify("jumpstyle dancing"), CoarseAction::Jumping);
    }

    #[test]
    fn test_vocabulary_from_json() {
        let json = r#"[{"action": "sitting", "keywords": ["Couch"]}]"#;
        let vocab: CoarseVocabulary = serde_json::from_str(json).unwrap();
        assert_eq!(vocab.buckets()[0].keywords, vec!["couch".to_string()]);
        assert_eq!(vocab.classify("lying on couch"), CoarseAction::Sitting);
        assert_eq!(vocab.classify("walking"), CoarseAction::Other);
    }

    #[test]
    fn test_label_sides() {
        let vocab = AbnormalVocabulary::default();
        assert_eq!(vocab.side_of("Violence"), LabelSide::Abnormal);
        assert_eq!(vocab.side_of("Abnormal"), LabelSide::Abnormal);
        assert_eq!(vocab.side_of("Non-Violence"), LabelSide::Normal);
        assert_eq!(vocab.side_of("NonViolence"), LabelSide::Normal);
        assert_eq!(vocab.side_of("Normal Videos"), LabelSide::Normal);
        assert_eq!(vocab.side_of("LABEL_0"), LabelSide::Unknown);
    }
}
