//! Ready-made device adapters: test patterns and command-backed sources

pub mod color;
pub mod command;
pub mod tone;

pub use color::{ColorSource, RawVideoFormat};
pub use command::{CommandAudioSource, CommandVideoSource, DEFAULT_READ_TIMEOUT};
pub use tone::ToneSource;
