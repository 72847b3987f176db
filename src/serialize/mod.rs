//! Conversion of frames into raw byte buffers plus a description of them

pub mod audio;
pub mod video;

pub use audio::{AudioMetadata, serialize_audio};
pub use video::{VideoMetadata, serialize_video};

use crate::error::Result;
use crate::media::MediaKind;
use crate::process::EnvironmentVariables;

/// Description of a serialized frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMetadata {
    Audio(AudioMetadata),
    Video(VideoMetadata),
}

impl FrameMetadata {
    pub fn kind(&self) -> MediaKind {
        match self {
            FrameMetadata::Audio(_) => MediaKind::Audio,
            FrameMetadata::Video(_) => MediaKind::Video,
        }
    }

    /// Environment handed to a tee process, one variable per field
    /// (`pixFormat` becomes `PIXFORMAT`)
    pub fn environment(&self) -> Result<EnvironmentVariables> {
        match self {
            FrameMetadata::Audio(meta) => EnvironmentVariables::from_fields(meta),
            FrameMetadata::Video(meta) => EnvironmentVariables::from_fields(meta),
        }
    }
}

impl From<AudioMetadata> for FrameMetadata {
    fn from(meta: AudioMetadata) -> Self {
        FrameMetadata::Audio(meta)
    }
}

impl From<VideoMetadata> for FrameMetadata {
    fn from(meta: VideoMetadata) -> Self {
        FrameMetadata::Video(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_environment() {
        let meta = FrameMetadata::from(AudioMetadata {
            sample_format: "Int16Interleaved".into(),
            channels: 2,
            sample_rate: 44100,
            samples: 256,
        });
        assert_eq!(meta.kind(), MediaKind::Audio);
        let env = meta.environment().unwrap();
        assert_eq!(env.len(), 4);
        assert_eq!(env.get("SAMPLE_FORMAT"), Some("Int16Interleaved"));
        assert_eq!(env.get("CHANNELS"), Some("2"));
        assert_eq!(env.get("SAMPLINGRATE"), Some("44100"));
        assert_eq!(env.get("LEN"), Some("256"));
        assert_eq!(env.get("SAMPLE_RATE"), None);
    }

    #[test]
    fn test_video_environment() {
        let env = FrameMetadata::Video(VideoMetadata {
            width: 640,
            height: 480,
            pix_format: "RGBA".into(),
            pix_subsample_ratio: String::new(),
        })
        .environment()
        .unwrap();
        assert_eq!(env.get("WIDTH"), Some("640"));
        assert_eq!(env.get("HEIGHT"), Some("480"));
        assert_eq!(env.get("PIXFORMAT"), Some("RGBA"));
        assert_eq!(env.get("PIXSUBSAMPLERATIO"), Some(""));
        assert_eq!(env.get("PIX_FORMAT"), None);
    }
}
