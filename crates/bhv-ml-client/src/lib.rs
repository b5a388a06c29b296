//! Client for the Python ML service (video clip classification).
//!
//! The service hosts the Hugging Face video models and answers one request
//! per clip window. [`MlClassifier`] adapts it to the engine's
//! [`bhv_media::ClipClassifier`] capability so a remote model and a local
//! ONNX model are interchangeable.

pub mod classifier;
pub mod client;
pub mod error;
pub mod types;

pub use classifier::MlClassifier;
pub use client::{MlClient, MlClientConfig};
pub use error::{MlError, MlResult};
pub use types::{ClassifyRequest, ClassifyResponse, HealthResponse};
