//! Traits implemented by capture device adapters

use crate::error::Result;
use crate::media::{AudioReader, MediaProperties, VideoReader};
use async_trait::async_trait;

/// Resource acquisition of a capture device
#[async_trait]
pub trait Adapter: Send {
    /// Acquire the device
    async fn open(&mut self) -> Result<()>;

    /// Release the device; readers handed out earlier should end
    async fn close(&mut self) -> Result<()>;

    /// Media properties the device can deliver
    fn properties(&self) -> Vec<MediaProperties>;
}

/// Adapter producing video frames
#[async_trait]
pub trait VideoAdapter: Adapter {
    async fn video_record(&mut self, props: MediaProperties) -> Result<VideoReader>;
}

/// Adapter producing audio chunks
#[async_trait]
pub trait AudioAdapter: Adapter {
    async fn audio_record(&mut self, props: MediaProperties) -> Result<AudioReader>;
}

#[async_trait]
impl<A: Adapter + ?Sized> Adapter for Box<A> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn properties(&self) -> Vec<MediaProperties> {
        (**self).properties()
    }
}

#[async_trait]
impl<A: VideoAdapter + ?Sized> VideoAdapter for Box<A> {
    async fn video_record(&mut self, props: MediaProperties) -> Result<VideoReader> {
        (**self).video_record(props).await
    }
}

#[async_trait]
impl<A: AudioAdapter + ?Sized> AudioAdapter for Box<A> {
    async fn audio_record(&mut self, props: MediaProperties) -> Result<AudioReader> {
        (**self).audio_record(props).await
    }
}
