//! Core media types shared by readers, serializers and devices

use serde::{Deserialize, Serialize};

/// Kind of media data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Video frame data
    Video,
    /// Audio sample data
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "Video"),
            MediaKind::Audio => write!(f, "Audio"),
        }
    }
}

/// Video constraints requested from (or advertised by) a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    /// Raw layout name, e.g. `"I420"` or `"RGBA"`
    pub frame_format: String,
    pub frame_rate: f32,
}

/// Audio constraints requested from (or advertised by) a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioProperties {
    pub channel_count: u16,
    pub sample_rate: u32,
    /// Number of samples per channel in each chunk
    pub samples_per_chunk: usize,
    /// Sample layout name, e.g. `"Int16Interleaved"`
    pub sample_format: String,
}

/// Media properties passed to a device's record routine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaProperties {
    pub device_id: String,
    pub video: VideoProperties,
    pub audio: AudioProperties,
}

impl MediaProperties {
    pub fn video(device_id: impl Into<String>, video: VideoProperties) -> Self {
        Self {
            device_id: device_id.into(),
            video,
            audio: AudioProperties::default(),
        }
    }

    pub fn audio(device_id: impl Into<String>, audio: AudioProperties) -> Self {
        Self {
            device_id: device_id.into(),
            video: VideoProperties::default(),
            audio,
        }
    }
}
