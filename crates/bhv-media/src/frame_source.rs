//! Cached random access over a sequential video stream.
//!
//! Windows request monotonically non-decreasing indices with heavy overlap.
//! The source reads forward, keeps every requested frame in a cache keyed by
//! frame index, and seeks only when an uncached index lies behind the read
//! cursor. Each physical frame is decoded at most once per analysis.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{trace, warn};

use bhv_models::VideoMeta;

use crate::classifier::DecodedFrame;
use crate::error::MediaResult;
use crate::metrics;
use crate::stream::VideoStream;

/// Counters for one frame source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSourceStats {
    pub decoded: usize,
    pub cache_hits: usize,
    pub seeks: usize,
    pub failed: usize,
}

pub struct FrameSource<S> {
    stream: S,
    cache: HashMap<usize, DecodedFrame>,
    /// Indices whose decode failed; never read again
    failed: HashSet<usize>,
    /// Index the next `read_next` returns
    cursor: usize,
    /// The stream returned end-of-stream at `cursor`
    exhausted: bool,
    /// The stream position may disagree with `cursor` after a decode error
    needs_resync: bool,
    stats: FrameSourceStats,
}

impl<S: VideoStream> FrameSource<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            cache: HashMap::new(),
            failed: HashSet::new(),
            cursor: 0,
            exhausted: false,
            needs_resync: false,
            stats: FrameSourceStats::default(),
        }
    }

    pub fn meta(&self) -> VideoMeta {
        self.stream.meta()
    }

    pub fn stats(&self) -> FrameSourceStats {
        self.stats
    }

    pub fn cached_frames(&self) -> usize {
        self.cache.len()
    }

    /// Decoded frames for `window`, in order.
    ///
    /// Indices that cannot be decoded are left out, so the result may be
    /// shorter than the window. Only errors that make the whole stream
    /// unusable are returned.
    pub async fn frames_for(&mut self, window: &[usize]) -> MediaResult<Vec<DecodedFrame>> {
        let mut frames = Vec::with_capacity(window.len());
        for &index in window {
            if let Some(frame) = self.frame(index).await? {
                frames.push(frame);
            }
        }
        Ok(frames)
    }

    /// Drop cached frames below `index`.
    ///
    /// Windows never go backwards, so frames before the next window's first
    /// index are not requested again.
    pub fn evict_before(&mut self, index: usize) {
        self.cache.retain(|&i, _| i >= index);
    }

    async fn frame(&mut self, index: usize) -> MediaResult<Option<DecodedFrame>> {
        if let Some(frame) = self.cache.get(&index) {
            self.stats.cache_hits += 1;
            return Ok(Some(Arc::clone(frame)));
        }
        if self.failed.contains(&index) {
            return Ok(None);
        }

        if index < self.cursor {
            self.seek_to(index).await?;
        }

        while !self.exhausted && self.cursor <= index {
            if self.needs_resync {
                self.seek_to(self.cursor).await?;
            }

            let at = self.cursor;
            let read = self.stream.read_next().await;
            match read {
                Ok(Some(image)) => {
                    self.cursor += 1;
                    self.stats.decoded += 1;
                    metrics::record_frame_decoded();
                    if at == index {
                        let frame = Arc::new(image);
                        self.cache.insert(index, Arc::clone(&frame));
                        return Ok(Some(frame));
                    }
                }
                Ok(None) => {
                    trace!(index = at, "End of stream");
                    self.exhausted = true;
                }
                Err(e) if e.is_window_recoverable() => {
                    warn!(index = at, error = %e, "Frame decode failed");
                    self.failed.insert(at);
                    self.stats.failed += 1;
                    self.cursor += 1;
                    self.needs_resync = true;
                    if at == index {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    async fn seek_to(&mut self, index: usize) -> MediaResult<()> {
        trace!(from = self.cursor, to = index, "Seeking");
        self.stream.seek(index).await?;
        self.cursor = index;
        self.exhausted = false;
        self.needs_resync = false;
        self.stats.seeks += 1;
        metrics::record_seek();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::SyntheticStream;
    use super::*;

    fn red(frame: &DecodedFrame) -> u8 {
        frame.get_pixel(0, 0)[0]
    }

    #[tokio::test]
    async fn test_overlapping_windows_reuse_cache() {
        let mut source = FrameSource::new(SyntheticStream::new(30.0, 80));
        let first: Vec<usize> = (0..16).map(|i| i * 3).collect();
        let second: Vec<usize> = (8..24).map(|i| i * 3).collect();

        let frames = source.frames_for(&first).await.unwrap();
        assert_eq!(frames.len(), 16);
        assert_eq!(red(&frames[5]), 15);

        let frames = source.frames_for(&second).await.unwrap();
        assert_eq!(frames.len(), 16);
        assert_eq!(red(&frames[0]), 24);

        let stats = source.stats();
        assert_eq!(stats.cache_hits, 8);
        assert_eq!(stats.seeks, 0);
        assert_eq!(source.stream.reads, 70);
    }

    #[tokio::test]
    async fn test_seek_when_behind_cursor() {
        let mut source = FrameSource::new(SyntheticStream::new(30.0, 20));
        source.frames_for(&[10]).await.unwrap();
        let frames = source.frames_for(&[2]).await.unwrap();
        assert_eq!(red(&frames[0]), 2);
        assert_eq!(source.stream.seeks, vec![2]);
    }

    #[tokio::test]
    async fn test_end_of_stream_gives_short_window() {
        let mut source = FrameSource::new(SyntheticStream::new(30.0, 10));
        let frames = source.frames_for(&[6, 8, 10, 12]).await.unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_index_is_not_reread() {
        let mut stream = SyntheticStream::new(30.0, 20);
        stream.broken = vec![4];
        let mut source = FrameSource::new(stream);

        let frames = source.frames_for(&[2, 4, 6]).await.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(red(&frames[1]), 6);
        let reads = source.stream.reads;

        let frames = source.frames_for(&[4, 6, 8]).await.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(source.stats().failed, 1);
        // Only frames 7 and 8 were read for the second window
        assert_eq!(source.stream.reads, reads + 2);
    }

    #[tokio::test]
    async fn test_eviction() {
        let mut source = FrameSource::new(SyntheticStream::new(30.0, 20));
        source.frames_for(&[0, 1, 2, 3]).await.unwrap();
        source.evict_before(2);
        assert_eq!(source.cached_frames(), 2);
    }
}
