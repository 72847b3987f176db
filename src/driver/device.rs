//! Devices with exactly one recording capability

use crate::driver::adapter::{AudioAdapter, VideoAdapter};
use crate::driver::lifecycle::Lifecycle;
use crate::driver::state::DeviceState;
use crate::error::Result;
use crate::media::{MediaKind, MediaProperties};

pub type VideoDevice = Lifecycle<Box<dyn VideoAdapter>>;
pub type AudioDevice = Lifecycle<Box<dyn AudioAdapter>>;

/// A wrapped adapter, selected by its media kind
pub enum Device {
    Video(VideoDevice),
    Audio(AudioDevice),
}

impl Device {
    pub fn video(adapter: impl VideoAdapter + 'static) -> Self {
        let adapter: Box<dyn VideoAdapter> = Box::new(adapter);
        Device::Video(Lifecycle::new(adapter))
    }

    pub fn audio(adapter: impl AudioAdapter + 'static) -> Self {
        let adapter: Box<dyn AudioAdapter> = Box::new(adapter);
        Device::Audio(Lifecycle::new(adapter))
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Device::Video(_) => MediaKind::Video,
            Device::Audio(_) => MediaKind::Audio,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Device::Video(d) => d.id(),
            Device::Audio(d) => d.id(),
        }
    }

    pub async fn status(&self) -> DeviceState {
        match self {
            Device::Video(d) => d.status().await,
            Device::Audio(d) => d.status().await,
        }
    }

    pub async fn properties(&self) -> Vec<MediaProperties> {
        match self {
            Device::Video(d) => d.properties().await,
            Device::Audio(d) => d.properties().await,
        }
    }

    pub async fn open(&self) -> Result<()> {
        match self {
            Device::Video(d) => d.open().await,
            Device::Audio(d) => d.open().await,
        }
    }

    pub async fn close(&self) -> Result<()> {
        match self {
            Device::Video(d) => d.close().await,
            Device::Audio(d) => d.close().await,
        }
    }

    pub fn as_video(&self) -> Option<&VideoDevice> {
        match self {
            Device::Video(d) => Some(d),
            Device::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioDevice> {
        match self {
            Device::Audio(d) => Some(d),
            Device::Video(_) => None,
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .finish()
    }
}
