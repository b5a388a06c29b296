//! Video metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Frame rate assumed when the container does not report a usable one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Frame rate and frame count of a video, read once per analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMeta {
    /// Original frame rate (always > 0)
    pub fps: f64,
    /// Total number of frames
    pub frame_count: usize,
}

impl VideoMeta {
    /// Create metadata, substituting [`DEFAULT_FPS`] for a zero, negative or
    /// non-finite frame rate.
    pub fn new(fps: f64, frame_count: usize) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            DEFAULT_FPS
        };
        Self { fps, frame_count }
    }

    /// Duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    /// Timestamp of a frame index in seconds.
    #[inline]
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let meta = VideoMeta::new(30.0, 600);
        assert!((meta.duration_sec() - 20.0).abs() < 1e-9);
        assert!((meta.time_of(597) - 19.9).abs() < 1e-9);
    }

    #[test]
    fn test_unreadable_fps_defaults() {
        assert_eq!(VideoMeta::new(0.0, 10).fps, DEFAULT_FPS);
        assert_eq!(VideoMeta::new(-5.0, 10).fps, DEFAULT_FPS);
        assert_eq!(VideoMeta::new(f64::NAN, 10).fps, DEFAULT_FPS);
        assert_eq!(VideoMeta::new(25.0, 10).fps, 25.0);
    }

    #[test]
    fn test_empty_video() {
        let meta = VideoMeta::new(30.0, 0);
        assert_eq!(meta.duration_sec(), 0.0);
    }
}
