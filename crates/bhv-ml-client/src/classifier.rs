//! Remote clip classifier.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::debug;

use bhv_media::{ClassDistribution, ClipClassifier, DecodedFrame, MediaError, MediaResult};

use crate::client::MlClient;
use crate::error::{MlError, MlResult};
use crate::types::ClassifyRequest;

const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encode one frame as base64 JPEG.
pub fn encode_frame(frame: &RgbImage, quality: u8) -> MlResult<String> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(frame)
        .map_err(|e| MlError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(buf.into_inner()))
}

/// [`ClipClassifier`] backed by a model hosted in the ML service.
pub struct MlClassifier {
    client: Arc<MlClient>,
    model: String,
    jpeg_quality: u8,
}

impl MlClassifier {
    pub fn new(client: Arc<MlClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Builder-style setter for JPEG quality (1-100).
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    async fn request_for(&self, frames: &[DecodedFrame]) -> MlResult<ClassifyRequest> {
        let frames = frames.to_vec();
        let quality = self.jpeg_quality;
        let encoded = tokio::task::spawn_blocking(move || {
            frames
                .iter()
                .map(|frame| encode_frame(frame, quality))
                .collect::<MlResult<Vec<_>>>()
        })
        .await
        .map_err(|e| MlError::Encode(format!("encoding task failed: {e}")))??;

        Ok(ClassifyRequest {
            model: self.model.clone(),
            frames: encoded,
        })
    }

    fn failed(&self, error: impl std::fmt::Display) -> MediaError {
        MediaError::classifier_failed(self.model.clone(), error.to_string())
    }
}

#[async_trait]
impl ClipClassifier for MlClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn predict_full(&self, frames: &[DecodedFrame]) -> MediaResult<ClassDistribution> {
        let request = self.request_for(frames).await.map_err(|e| self.failed(e))?;
        let response = self
            .client
            .classify(&request)
            .await
            .map_err(|e| self.failed(e))?;

        debug!(model = %self.model, classes = response.labels.len(), "Remote classification complete");

        ClassDistribution::new(response.probs, response.labels).map_err(|e| self.failed(e))
    }
}
