//! External process hosting

pub mod command;
pub mod env;
pub mod host;
pub mod output;

pub use command::CommandSpec;
pub use env::EnvironmentVariables;
pub use host::{DEFAULT_CLOSE_TIMEOUT, ProcessHost, ProcessState};
pub use output::{OutputStream, forward_lines};
