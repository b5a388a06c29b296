//! Shared data models for the behavior timeline engine.
//!
//! This crate provides Serde-serializable types for:
//! - Video metadata read once per analysis
//! - Coarse action vocabulary and event kinds
//! - Per-clip predictions, merged events and flags
//! - The analysis report and its summary

pub mod action;
pub mod report;
pub mod utils;
pub mod video;

// Re-export common types
pub use action::{CoarseAction, EventKind, UnknownActionError};
pub use report::{
    AnalysisParams, ClipPrediction, Event, LabelScore, Report, Summary, WindowStats,
};
pub use utils::round_to;
pub use video::{VideoMeta, DEFAULT_FPS};
