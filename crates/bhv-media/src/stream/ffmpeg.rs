//! FFmpeg rawvideo pipe stream.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};
use tracing::{debug, trace};

use bhv_models::VideoMeta;

use super::VideoStream;
use crate::command::DecodeCommand;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Decodes frames by piping `rgb24` rawvideo out of an FFmpeg child process.
///
/// The decoder starts lazily on the first read. Seeking restarts it with an
/// input-side `-ss` at the target frame's timestamp.
pub struct FfmpegStream {
    path: PathBuf,
    meta: VideoMeta,
    width: u32,
    height: u32,
    /// Index of the frame the next read returns
    position: usize,
    decoder: Option<Decoder>,
}

struct Decoder {
    // Held so the process is killed when the decoder is dropped
    _child: Child,
    stdout: ChildStdout,
}

impl FfmpegStream {
    /// Probe the video and prepare a stream positioned at frame 0.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let info = probe_video(path).await?;
        if info.width == 0 || info.height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "{} has no frame dimensions",
                path.display()
            )));
        }

        debug!(
            path = %path.display(),
            fps = info.fps,
            frames = info.frame_count,
            width = info.width,
            height = info.height,
            codec = %info.codec,
            duration = info.duration,
            "Opened FFmpeg stream"
        );

        Ok(Self {
            path: path.to_path_buf(),
            meta: info.meta(),
            width: info.width,
            height: info.height,
            position: 0,
            decoder: None,
        })
    }

    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    fn start_decoder(&mut self) -> MediaResult<()> {
        let mut child = DecodeCommand::new(&self.path)
            .seek(self.meta.time_of(self.position))
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stdout not captured"))?;
        trace!(position = self.position, "Started FFmpeg decoder");
        self.decoder = Some(Decoder {
            _child: child,
            stdout,
        });
        Ok(())
    }
}

#[async_trait]
impl VideoStream for FfmpegStream {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    async fn read_next(&mut self) -> MediaResult<Option<RgbImage>> {
        if self.decoder.is_none() {
            self.start_decoder()?;
        }
        let frame_bytes = self.frame_bytes();
        let index = self.position;
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(MediaError::internal("decoder not running"));
        };

        let mut buf = vec![0u8; frame_bytes];
        let result = decoder.stdout.read_exact(&mut buf).await;
        match result {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.decoder = None;
                return Ok(None);
            }
            Err(e) => {
                self.decoder = None;
                self.position += 1;
                return Err(MediaError::decode_failed(index, e.to_string()));
            }
        }

        self.position += 1;
        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| MediaError::decode_failed(index, "frame buffer size mismatch"))
    }

    async fn seek(&mut self, index: usize) -> MediaResult<()> {
        self.decoder = None;
        self.position = index;
        Ok(())
    }
}
