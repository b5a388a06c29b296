//! OpenCV `VideoCapture` stream.

use std::path::Path;

use async_trait::async_trait;
use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{
    VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_POS_FRAMES,
};
use tracing::debug;

use bhv_models::VideoMeta;

use super::VideoStream;
use crate::error::{MediaError, MediaResult};

/// Frames read through OpenCV, converted from BGR to RGB.
///
/// Decoding is synchronous; each call blocks for one frame.
pub struct OpenCvStream {
    cap: VideoCapture,
    meta: VideoMeta,
    position: usize,
}

impl OpenCvStream {
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::InvalidVideo(format!("non UTF-8 path: {}", path.display())))?;

        let cap = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| MediaError::InvalidVideo(format!("Failed to open video: {}", e)))?;
        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::InvalidVideo(format!(
                "OpenCV cannot open {}",
                path.display()
            )));
        }

        let fps = cap.get(CAP_PROP_FPS).unwrap_or(0.0);
        let frame_count = cap.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0).max(0.0) as usize;
        let meta = VideoMeta::new(fps, frame_count);

        debug!(path = %path.display(), fps = meta.fps, frames = frame_count, "Opened OpenCV stream");

        Ok(Self {
            cap,
            meta,
            position: 0,
        })
    }
}

fn mat_to_rgb(frame: &Mat, index: usize) -> MediaResult<RgbImage> {
    let mut rgb = Mat::default();
    opencv::imgproc::cvt_color_def(frame, &mut rgb, opencv::imgproc::COLOR_BGR2RGB)
        .map_err(|e| MediaError::decode_failed(index, format!("Color conversion failed: {}", e)))?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb
        .data_bytes()
        .map_err(|e| MediaError::decode_failed(index, format!("Failed to get frame data: {}", e)))?;

    RgbImage::from_raw(width, height, data.to_vec())
        .ok_or_else(|| MediaError::decode_failed(index, "frame buffer size mismatch"))
}

#[async_trait]
impl VideoStream for OpenCvStream {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    async fn read_next(&mut self) -> MediaResult<Option<RgbImage>> {
        let index = self.position;
        let mut frame = Mat::default();
        let ok = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::decode_failed(index, e.to_string()))?;
        if !ok || frame.empty() {
            return Ok(None);
        }
        self.position += 1;
        mat_to_rgb(&frame, index).map(Some)
    }

    async fn seek(&mut self, index: usize) -> MediaResult<()> {
        self.cap
            .set(CAP_PROP_POS_FRAMES, index as f64)
            .map_err(|e| MediaError::decode_failed(index, format!("seek failed: {}", e)))?;
        self.position = index;
        Ok(())
    }
}
