//! Media frames, properties and the reader contract

pub mod audio;
pub mod reader;
pub mod types;
pub mod video;

pub use audio::{AudioChunk, ChunkInfo, SampleFormat};
pub use reader::{AudioReader, FrameReader, QueueReader, Release, VideoReader};
pub use types::{AudioProperties, MediaKind, MediaProperties, VideoProperties};
pub use video::{PackedFormat, Pixels, SubsampleRatio, VideoFrame};
