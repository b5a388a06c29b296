//! ML service request/response types.

use serde::{Deserialize, Serialize};

/// Request to classify one clip window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// Model identifier understood by the service
    pub model: String,
    /// Base64 encoded JPEG frames in temporal order
    pub frames: Vec<String>,
}

/// Full class distribution for a clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// Label for each class index
    pub labels: Vec<String>,
    /// Probability for each class index
    pub probs: Vec<f64>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
