//! Behavior timeline analysis for recorded video.
//!
//! This crate provides:
//! - Frame sampling and overlapping window planning
//! - Cached frame access over FFmpeg (or OpenCV) decoded streams
//! - The clip classifier capability, with an optional ONNX Runtime backend
//! - Per-window action and abnormal evaluation
//! - Run-length event aggregation, summary and JSON report persistence

pub mod aggregator;
pub mod classifier;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod frame_source;
pub mod metrics;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod probe;
pub mod report;
pub mod sampler;
pub mod stream;
pub mod vocabulary;

pub use classifier::{softmax, ClassDistribution, ClipClassifier, DecodedFrame, TOP_K};
pub use command::{check_ffmpeg, check_ffprobe};
pub use config::EngineConfig;
pub use engine::BehaviorEngine;
pub use error::{MediaError, MediaResult};
pub use evaluator::{evaluate_abnormal, evaluate_action, ClipEvaluator};
pub use frame_source::FrameSource;
#[cfg(feature = "onnx")]
pub use onnx::OrtVideoClassifier;
pub use probe::{probe_video, VideoInfo};
pub use report::{summarize, ReportBuilder};
pub use sampler::{make_windows, sample_indices};
#[cfg(feature = "opencv")]
pub use stream::OpenCvStream;
pub use stream::{open_stream, FfmpegStream, VideoStream};
pub use vocabulary::{AbnormalVocabulary, CoarseVocabulary};
