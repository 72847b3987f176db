//! Media tee: pass frames through while mirroring their raw bytes to an
//! external process

pub mod frame;
pub mod stats;
pub mod transformer;

pub use frame::TeeFrame;
pub use stats::TeeStats;
pub use transformer::{
    AudioTeeTransformer, TeeReader, TeeTransformer, VideoTeeTransformer, create_audio_tee_transformer,
    create_video_tee_transformer,
};
