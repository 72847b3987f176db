//! Capture device drivers and their lifecycle

pub mod adapter;
pub mod device;
pub mod lifecycle;
pub mod state;

pub use adapter::{Adapter, AudioAdapter, VideoAdapter};
pub use device::{AudioDevice, Device, VideoDevice};
pub use lifecycle::Lifecycle;
pub use state::DeviceState;
