//! Raw audio layout: samples little-endian, channels interleaved or
//! concatenated in channel order, exactly as the chunk stores them

use crate::error::Result;
use crate::media::AudioChunk;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Describes the raw buffer produced from an audio chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Layout name, e.g. `"Int16Interleaved"`
    pub sample_format: String,
    pub channels: u16,
    #[serde(rename = "samplingRate")]
    pub sample_rate: u32,
    /// Samples per channel
    #[serde(rename = "len")]
    pub samples: usize,
}

impl AudioMetadata {
    pub fn of(chunk: &AudioChunk) -> Self {
        let info = chunk.info();
        Self {
            sample_format: chunk.sample_format().as_str().to_string(),
            channels: info.channels,
            sample_rate: info.sample_rate,
            samples: info.len,
        }
    }
}

pub fn serialize_audio(chunk: &AudioChunk) -> Result<(Bytes, AudioMetadata)> {
    let metadata = AudioMetadata::of(chunk);
    let info = chunk.info();
    let capacity = info.len * info.channels as usize * chunk.sample_format().bytes_per_sample();
    let mut buf = BytesMut::with_capacity(capacity);

    match chunk {
        AudioChunk::Int16Interleaved { data, .. } => {
            data.iter().for_each(|s| buf.put_i16_le(*s));
        }
        AudioChunk::Float32Interleaved { data, .. } => {
            data.iter().for_each(|s| buf.put_f32_le(*s));
        }
        AudioChunk::Int16NonInterleaved { data, .. } => {
            data.iter().flatten().for_each(|s| buf.put_i16_le(*s));
        }
        AudioChunk::Float32NonInterleaved { data, .. } => {
            data.iter().flatten().for_each(|s| buf.put_f32_le(*s));
        }
    }

    Ok((buf.freeze(), metadata))
}
