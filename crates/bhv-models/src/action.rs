//! Coarse action vocabulary and event kinds.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Small fixed vocabulary that fine-grained action labels are bucketed into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CoarseAction {
    Walking,
    Running,
    Sitting,
    Lying,
    Jumping,
    Standing,
    Playing,
    /// Unmatched or low-confidence prediction
    Other,
}

impl CoarseAction {
    /// Every coarse action, in table order.
    pub const ALL: [CoarseAction; 8] = [
        Self::Walking,
        Self::Running,
        Self::Sitting,
        Self::Lying,
        Self::Jumping,
        Self::Standing,
        Self::Playing,
        Self::Other,
    ];

    /// Returns the action as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Running => "running",
            Self::Sitting => "sitting",
            Self::Lying => "lying",
            Self::Jumping => "jumping",
            Self::Standing => "standing",
            Self::Playing => "playing",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for CoarseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a string that names neither a coarse action nor `abnormal`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown action: {0}")]
pub struct UnknownActionError(pub String);

impl FromStr for CoarseAction {
    type Err = UnknownActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownActionError(s.to_string()))
    }
}

/// Kind of a merged event: a coarse action run or an abnormal run.
///
/// Serialized as a bare string (`"walking"`, `"abnormal"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventKind {
    Action(CoarseAction),
    Abnormal,
}

impl EventKind {
    pub const ABNORMAL: &'static str = "abnormal";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action(action) => action.as_str(),
            Self::Abnormal => Self::ABNORMAL,
        }
    }

    /// The coarse action for action events.
    pub fn action(&self) -> Option<CoarseAction> {
        match self {
            Self::Action(action) => Some(*action),
            Self::Abnormal => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for EventKind {
    type Error = UnknownActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case(Self::ABNORMAL) {
            return Ok(Self::Abnormal);
        }
        value.parse().map(Self::Action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for action in CoarseAction::ALL {
            assert_eq!(action.as_str().parse::<CoarseAction>().unwrap(), action);
        }
        assert_eq!(" Running ".parse::<CoarseAction>().unwrap(), CoarseAction::Running);
        assert!("flying".parse::<CoarseAction>().is_err());
    }

    #[test]
    fn test_event_kind_serializes_as_string() {
        let json = serde_json::to_string(&EventKind::Action(CoarseAction::Jumping)).unwrap();
        assert_eq!(json, "\"jumping\"");
        let json = serde_json::to_string(&EventKind::Abnormal).unwrap();
        assert_eq!(json, "\"abnormal\"");

        let kind: EventKind = serde_json::from_str("\"abnormal\"").unwrap();
        assert_eq!(kind, EventKind::Abnormal);
        assert!(serde_json::from_str::<EventKind>("\"dancing\"").is_err());
    }
}
