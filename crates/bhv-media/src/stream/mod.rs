//! Sequential video frame streams.
//!
//! A stream yields decoded RGB frames in order and can be repositioned with
//! [`VideoStream::seek`]. [`FfmpegStream`] is always available; the OpenCV
//! backend is compiled with the `opencv` feature.

mod ffmpeg;
#[cfg(feature = "opencv")]
mod capture;

use std::path::Path;

use async_trait::async_trait;
use image::RgbImage;

use bhv_models::VideoMeta;

use crate::error::MediaResult;

pub use ffmpeg::FfmpegStream;
#[cfg(feature = "opencv")]
pub use capture::OpenCvStream;

/// Capability: a decodable video stream.
#[async_trait]
pub trait VideoStream: Send {
    /// Frame rate and frame count, read once when the stream is opened.
    fn meta(&self) -> VideoMeta;

    /// Decode the frame at the current position and advance by one.
    ///
    /// Returns `Ok(None)` at end of stream.
    async fn read_next(&mut self) -> MediaResult<Option<RgbImage>>;

    /// Reposition so the next `read_next` returns frame `index`.
    async fn seek(&mut self, index: usize) -> MediaResult<()>;
}

#[async_trait]
impl<S: VideoStream + ?Sized> VideoStream for Box<S> {
    fn meta(&self) -> VideoMeta {
        (**self).meta()
    }

    async fn read_next(&mut self) -> MediaResult<Option<RgbImage>> {
        (**self).read_next().await
    }

    async fn seek(&mut self, index: usize) -> MediaResult<()> {
        (**self).seek(index).await
    }
}

/// Open a video with the best available backend.
pub async fn open_stream(path: impl AsRef<Path>) -> MediaResult<Box<dyn VideoStream>> {
    let path = path.as_ref();

    #[cfg(feature = "opencv")]
    {
        match OpenCvStream::open(path) {
            Ok(stream) => return Ok(Box::new(stream)),
            Err(e) => {
                tracing::warn!(error = %e, "OpenCV could not open video, falling back to FFmpeg");
            }
        }
    }

    Ok(Box::new(FfmpegStream::open(path).await?))
}
