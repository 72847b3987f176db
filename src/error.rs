//! Error types for mediatee

use crate::driver::DeviceState;
use std::io;

/// Result type alias using mediatee's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tee, process and device operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The command line did not tokenize to a usable executable.
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),

    /// A pipe for this stream was already requested.
    #[error("{0} pipe already opened")]
    PipeAlreadyOpened(&'static str),

    /// The operation is only allowed before the process is started.
    #[error("process already started")]
    AlreadyStarted,

    /// The OS refused to create the process.
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Standard input was not opened, or the process is not running.
    #[error("process stdin is not available")]
    StdinUnavailable,

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// The upstream reader has no more frames.
    #[error("end of stream")]
    EndOfStream,

    /// Any other upstream fault.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The frame representation has no raw tee layout.
    #[error("unsupported frame format: {0}")]
    UnsupportedFormat(String),

    /// A frame whose buffers do not match its declared geometry.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid device transition from {from} to {to}")]
    InvalidTransition { from: DeviceState, to: DeviceState },

    /// Failure reported by a device adapter.
    #[error("device error: {0}")]
    Device(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error marks the normal end of a stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}
