//! Mirror a live audio or video stream to an external process.
//!
//! A [`tee::TeeReader`] wraps any [`media::FrameReader`]: every frame it
//! yields is the untouched upstream frame, while its raw bytes are written
//! to the standard input of a spawned command. Capture devices are wrapped
//! in a [`driver::Device`] which enforces the open, record, close order.

pub mod config;
pub mod driver;
pub mod error;
pub mod media;
pub mod process;
pub mod serialize;
pub mod source;
pub mod tee;

pub use config::{StartPolicy, TeeConfig};
pub use driver::{Device, DeviceState};
pub use error::{Error, Result};
pub use media::{AudioChunk, FrameReader, MediaProperties, Release, VideoFrame};
pub use tee::{TeeReader, TeeTransformer, create_audio_tee_transformer, create_video_tee_transformer};
