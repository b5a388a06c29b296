//! Behavior analysis worker.
//!
//! This crate provides:
//! - Environment configuration for the engine, classifiers and outputs
//! - Classifier construction (ML service or local ONNX models)
//! - Structured per-analysis logging
//! - The caregiver narrative built from report flags
//! - Prometheus text export for batch runs

pub mod classifiers;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod narrative;

pub use classifiers::{build_classifiers, Classifiers};
pub use config::{NarrativeConfig, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use logging::AnalysisLogger;
pub use narrative::{narrative_lines, NarrativeClient};
