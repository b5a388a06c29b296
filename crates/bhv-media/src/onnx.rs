//! ONNX Runtime video classifier.
//!
//! Loads a video classification model exported from Hugging Face (VideoMAE,
//! TimeSformer) together with the `id2label` table from its `config.json`.
//! Frames are resized on the shortest edge, center-cropped, normalized and
//! stacked into a `[1, T, 3, H, W]` tensor. Logits are softmaxed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array5;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::classifier::{ClassDistribution, ClipClassifier, DecodedFrame};
use crate::error::{MediaError, MediaResult};

/// Per-channel mean and standard deviation applied after scaling to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// ImageNet statistics used by VideoMAE.
    pub const IMAGENET: Self = Self {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    /// Kinetics statistics used by TimeSformer.
    pub const KINETICS: Self = Self {
        mean: [0.45, 0.45, 0.45],
        std: [0.225, 0.225, 0.225],
    };
}

/// Hugging Face model config, only the label table is read.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: BTreeMap<String, String>,
}

/// Parse the `id2label` table of a Hugging Face `config.json`.
///
/// Keys must cover `0..n` without gaps.
pub fn parse_id2label(json: &str) -> MediaResult<Vec<String>> {
    let config: ModelConfig = serde_json::from_str(json)?;
    let mut by_index: BTreeMap<usize, String> = BTreeMap::new();
    for (key, label) in config.id2label {
        let index = key
            .parse::<usize>()
            .map_err(|_| MediaError::internal(format!("non-numeric id2label key: {key}")))?;
        by_index.insert(index, label);
    }
    if by_index.keys().enumerate().any(|(i, &k)| i != k) {
        return Err(MediaError::internal("id2label indices are not contiguous"));
    }
    Ok(by_index.into_values().collect())
}

/// Resize so the shortest edge is `size`, then center-crop to `size`.
fn resize_and_crop(frame: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    let scale = size as f32 / w.min(h).max(1) as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(size);
    let new_h = ((h as f32 * scale).round() as u32).max(size);
    let resized = imageops::resize(frame, new_w, new_h, FilterType::Triangle);
    let x = (new_w - size) / 2;
    let y = (new_h - size) / 2;
    imageops::crop_imm(&resized, x, y, size, size).to_image()
}

/// Build the `[1, T, 3, H, W]` input tensor data for a clip.
pub fn preprocess_clip(
    frames: &[DecodedFrame],
    size: u32,
    norm: Normalization,
) -> (Vec<usize>, Vec<f32>) {
    let resized: Vec<RgbImage> = frames
        .par_iter()
        .map(|frame| resize_and_crop(frame, size))
        .collect();

    let s = size as usize;
    let mut tensor = Array5::<f32>::zeros((1, resized.len(), 3, s, s));
    for (t, image) in resized.iter().enumerate() {
        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                let v = pixel[c] as f32 / 255.0;
                tensor[[0, t, c, y as usize, x as usize]] = (v - norm.mean[c]) / norm.std[c];
            }
        }
    }

    (tensor.shape().to_vec(), tensor.into_raw_vec())
}

/// Video classifier backed by ONNX Runtime.
pub struct OrtVideoClassifier {
    name: String,
    session: Arc<Mutex<Session>>,
    labels: Vec<String>,
    input_size: u32,
    normalization: Normalization,
    output_name: String,
}

impl OrtVideoClassifier {
    /// Load `model.onnx` and `config.json` from an exported model directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> MediaResult<Self> {
        let dir = dir.as_ref();
        Self::load(dir.join("model.onnx"), dir.join("config.json"))
    }

    pub fn load(model_path: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> MediaResult<Self> {
        let model_path = model_path.into();
        let config_path = config_path.into();
        if !model_path.exists() {
            return Err(MediaError::model_not_found(model_path.display().to_string()));
        }

        let labels = parse_id2label(&std::fs::read_to_string(&config_path)?)?;

        let model_bytes = std::fs::read(&model_path)?;
        let session = Session::builder()
            .map_err(|e| MediaError::internal(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::internal(format!("ORT opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| MediaError::internal(format!("ORT load model: {e}")))?;

        let name = model_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| model_path.display().to_string());

        info!(model = %name, classes = labels.len(), "Loaded ONNX video classifier");

        Ok(Self {
            name,
            session: Arc::new(Mutex::new(session)),
            labels,
            input_size: 224,
            normalization: Normalization::IMAGENET,
            output_name: "logits".to_string(),
        })
    }

    /// Builder-style setter for the reported model name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style setter for the square input resolution.
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Builder-style setter for input normalization.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn run_session(session: &Mutex<Session>, output_name: &str, input: Value) -> MediaResult<Vec<f32>> {
    let mut session = session
        .lock()
        .map_err(|_| MediaError::internal("ORT session poisoned"))?;

    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| MediaError::internal(format!("ORT run failed: {e}")))?;

    let output = outputs
        .get(output_name)
        .ok_or_else(|| MediaError::internal(format!("ORT returned no {output_name} output")))?;

    let (_, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| MediaError::internal(format!("ORT extract: {e}")))?;

    Ok(data.to_vec())
}

#[async_trait]
impl ClipClassifier for OrtVideoClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict_full(&self, frames: &[DecodedFrame]) -> MediaResult<ClassDistribution> {
        let frames = frames.to_vec();
        let session = Arc::clone(&self.session);
        let output_name = self.output_name.clone();
        let size = self.input_size;
        let norm = self.normalization;

        // Preprocessing and inference are CPU bound
        let logits = tokio::task::spawn_blocking(move || {
            let (shape, data) = preprocess_clip(&frames, size, norm);
            let input = Tensor::from_array((shape, data.into_boxed_slice()))
                .map(Value::from)
                .map_err(|e| MediaError::internal(format!("ORT tensor: {e}")))?;
            run_session(&session, &output_name, input)
        })
        .await
        .map_err(|e| MediaError::internal(format!("inference task failed: {e}")))?
        .map_err(|e| MediaError::classifier_failed(self.name.clone(), e.to_string()))?;

        if logits.len() != self.labels.len() {
            return Err(MediaError::classifier_failed(
                self.name.clone(),
                format!("{} logits for {} labels", logits.len(), self.labels.len()),
            ));
        }
        debug!(model = %self.name, "ONNX inference complete");

        ClassDistribution::from_logits(&logits, self.labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_parse_id2label() {
        let json = r#"{"architectures": ["VideoMAEForVideoClassification"],
            "id2label": {"1": "Violence", "0": "NonViolence"}}"#;
        assert_eq!(parse_id2label(json).unwrap(), vec!["NonViolence", "Violence"]);

        let gap = r#"{"id2label": {"0": "a", "2": "c"}}"#;
        assert!(parse_id2label(gap).is_err());
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let white: DecodedFrame = Arc::new(RgbImage::from_pixel(64, 48, Rgb([255, 255, 255])));
        let frames = vec![white; 4];
        let (shape, data) = preprocess_clip(&frames, 32, Normalization::IMAGENET);
        assert_eq!(shape, vec![1, 4, 3, 32, 32]);
        assert_eq!(data.len(), 4 * 3 * 32 * 32);

        let expected_r = (1.0 - 0.485) / 0.229;
        assert!((data[0] - expected_r).abs() < 1e-4);
        let expected_b = (1.0 - 0.406) / 0.225;
        assert!((data[2 * 32 * 32] - expected_b).abs() < 1e-4);
    }

    #[test]
    fn test_resize_and_crop_is_square() {
        let frame = RgbImage::new(320, 180);
        let out = resize_and_crop(&frame, 224);
        assert_eq!(out.dimensions(), (224, 224));
    }
}
