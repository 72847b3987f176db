//! Frame types a tee can mirror

use crate::error::Result;
use crate::media::{AudioChunk, MediaKind, VideoFrame};
use crate::serialize::{FrameMetadata, serialize_audio, serialize_video};
use bytes::Bytes;

/// A frame with a raw byte layout understood by tee processes
pub trait TeeFrame: Send + Sync + 'static {
    const KIND: MediaKind;

    fn to_raw(&self) -> Result<(Bytes, FrameMetadata)>;
}

impl TeeFrame for AudioChunk {
    const KIND: MediaKind = MediaKind::Audio;

    fn to_raw(&self) -> Result<(Bytes, FrameMetadata)> {
        let (bytes, meta) = serialize_audio(self)?;
        Ok((bytes, meta.into()))
    }
}

impl TeeFrame for VideoFrame {
    const KIND: MediaKind = MediaKind::Video;

    fn to_raw(&self) -> Result<(Bytes, FrameMetadata)> {
        let (bytes, meta) = serialize_video(self)?;
        Ok((bytes, meta.into()))
    }
}
