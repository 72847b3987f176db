//! Pull-style frame reader contract
//!
//! Every stage of a pipeline, including the tee, exposes the same shape:
//! `read()` yields the next frame together with a [`Release`] callback,
//! or an error that ends the stream.

use crate::error::Result;
use crate::media::{AudioChunk, VideoFrame};
use async_trait::async_trait;

/// Callback handing a frame's resources back to its producer
pub struct Release(Option<Box<dyn FnOnce() + Send>>);

impl Release {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A callback that does nothing
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn release(self) {
        if let Some(f) = self.0 {
            f();
        }
    }

    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }
}

impl std::fmt::Debug for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Release")
            .field(&if self.is_noop() { "noop" } else { "fn" })
            .finish()
    }
}

/// Source of frames pulled one at a time
///
/// A call may suspend until a frame is available. Once an error is returned
/// the reader must not be polled again.
#[async_trait]
pub trait FrameReader: Send {
    type Frame: Send + 'static;

    async fn read(&mut self) -> Result<(Self::Frame, Release)>;
}

#[async_trait]
impl<R> FrameReader for Box<R>
where
    R: FrameReader + ?Sized,
{
    type Frame = R::Frame;

    async fn read(&mut self) -> Result<(Self::Frame, Release)> {
        (**self).read().await
    }
}

/// Boxed reader of audio chunks
pub type AudioReader = Box<dyn FrameReader<Frame = AudioChunk>>;

/// Boxed reader of video frames
pub type VideoReader = Box<dyn FrameReader<Frame = VideoFrame>>;

/// Reader backed by an in-memory sequence; ends with [`Error::EndOfStream`]
///
/// [`Error::EndOfStream`]: crate::Error::EndOfStream
pub struct QueueReader<F> {
    frames: std::collections::VecDeque<Result<F>>,
}

impl<F> QueueReader<F> {
    pub fn new(frames: impl IntoIterator<Item = F>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
        }
    }

    /// Queue a mix of frames and failures, returned in order
    pub fn from_results(results: impl IntoIterator<Item = Result<F>>) -> Self {
        Self {
            frames: results.into_iter().collect(),
        }
    }
}

#[async_trait]
impl<F: Send + 'static> FrameReader for QueueReader<F> {
    type Frame = F;

    async fn read(&mut self) -> Result<(F, Release)> {
        match self.frames.pop_front() {
            Some(Ok(frame)) => Ok((frame, Release::noop())),
            Some(Err(e)) => Err(e),
            None => Err(crate::Error::EndOfStream),
        }
    }
}
