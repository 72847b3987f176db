//! In-memory audio chunk representations

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sample layout of an [`AudioChunk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    Float32Interleaved,
    Int16Interleaved,
    Float32NonInterleaved,
    Int16NonInterleaved,
}

impl SampleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleFormat::Float32Interleaved => "Float32Interleaved",
            SampleFormat::Int16Interleaved => "Int16Interleaved",
            SampleFormat::Float32NonInterleaved => "Float32NonInterleaved",
            SampleFormat::Int16NonInterleaved => "Int16NonInterleaved",
        }
    }

    /// Size in bytes of one sample of one channel
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::Float32Interleaved | SampleFormat::Float32NonInterleaved => 4,
            SampleFormat::Int16Interleaved | SampleFormat::Int16NonInterleaved => 2,
        }
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(
            self,
            SampleFormat::Float32Interleaved | SampleFormat::Int16Interleaved
        )
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "float32interleaved" | "f32le" => Ok(SampleFormat::Float32Interleaved),
            "int16interleaved" | "s16le" => Ok(SampleFormat::Int16Interleaved),
            "float32noninterleaved" | "f32lep" => Ok(SampleFormat::Float32NonInterleaved),
            "int16noninterleaved" | "s16lep" => Ok(SampleFormat::Int16NonInterleaved),
            other => Err(Error::Config(format!("unknown sample format {other:?}"))),
        }
    }
}

/// Shape of an audio chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Samples per channel
    pub len: usize,
    pub channels: u16,
    pub sample_rate: u32,
}

/// One buffer of audio samples pulled from a reader
#[derive(Debug, Clone, PartialEq)]
pub enum AudioChunk {
    /// `data[sample * channels + channel]`
    Float32Interleaved { info: ChunkInfo, data: Vec<f32> },
    /// `data[sample * channels + channel]`
    Int16Interleaved { info: ChunkInfo, data: Vec<i16> },
    /// `data[channel][sample]`
    Float32NonInterleaved { info: ChunkInfo, data: Vec<Vec<f32>> },
    /// `data[channel][sample]`
    Int16NonInterleaved { info: ChunkInfo, data: Vec<Vec<i16>> },
}

impl AudioChunk {
    pub fn int16_interleaved(channels: u16, sample_rate: u32, data: Vec<i16>) -> Result<Self> {
        let info = interleaved_info(channels, sample_rate, data.len())?;
        Ok(AudioChunk::Int16Interleaved { info, data })
    }

    pub fn float32_interleaved(channels: u16, sample_rate: u32, data: Vec<f32>) -> Result<Self> {
        let info = interleaved_info(channels, sample_rate, data.len())?;
        Ok(AudioChunk::Float32Interleaved { info, data })
    }

    pub fn int16_non_interleaved(sample_rate: u32, data: Vec<Vec<i16>>) -> Result<Self> {
        let lens: Vec<usize> = data.iter().map(Vec::len).collect();
        let info = planar_info(sample_rate, &lens)?;
        Ok(AudioChunk::Int16NonInterleaved { info, data })
    }

    pub fn float32_non_interleaved(sample_rate: u32, data: Vec<Vec<f32>>) -> Result<Self> {
        let lens: Vec<usize> = data.iter().map(Vec::len).collect();
        let info = planar_info(sample_rate, &lens)?;
        Ok(AudioChunk::Float32NonInterleaved { info, data })
    }

    /// Allocate a zeroed chunk of the given layout
    pub fn silence(format: SampleFormat, info: ChunkInfo) -> Self {
        let channels = info.channels as usize;
        match format {
            SampleFormat::Float32Interleaved => AudioChunk::Float32Interleaved {
                info,
                data: vec![0.0; info.len * channels],
            },
            SampleFormat::Int16Interleaved => AudioChunk::Int16Interleaved {
                info,
                data: vec![0; info.len * channels],
            },
            SampleFormat::Float32NonInterleaved => AudioChunk::Float32NonInterleaved {
                info,
                data: vec![vec![0.0; info.len]; channels],
            },
            SampleFormat::Int16NonInterleaved => AudioChunk::Int16NonInterleaved {
                info,
                data: vec![vec![0; info.len]; channels],
            },
        }
    }

    pub fn info(&self) -> ChunkInfo {
        match self {
            AudioChunk::Float32Interleaved { info, .. }
            | AudioChunk::Int16Interleaved { info, .. }
            | AudioChunk::Float32NonInterleaved { info, .. }
            | AudioChunk::Int16NonInterleaved { info, .. } => *info,
        }
    }

    pub fn sample_format(&self) -> SampleFormat {
        match self {
            AudioChunk::Float32Interleaved { .. } => SampleFormat::Float32Interleaved,
            AudioChunk::Int16Interleaved { .. } => SampleFormat::Int16Interleaved,
            AudioChunk::Float32NonInterleaved { .. } => SampleFormat::Float32NonInterleaved,
            AudioChunk::Int16NonInterleaved { .. } => SampleFormat::Int16NonInterleaved,
        }
    }

    /// Set one sample from a normalized value in `[-1.0, 1.0]`
    pub fn set_normalized(&mut self, sample: usize, channel: usize, value: f32) {
        let value = value.clamp(-1.0, 1.0);
        match self {
            AudioChunk::Float32Interleaved { info, data } => {
                data[sample * info.channels as usize + channel] = value;
            }
            AudioChunk::Int16Interleaved { info, data } => {
                data[sample * info.channels as usize + channel] = (value * i16::MAX as f32) as i16;
            }
            AudioChunk::Float32NonInterleaved { data, .. } => {
                data[channel][sample] = value;
            }
            AudioChunk::Int16NonInterleaved { data, .. } => {
                data[channel][sample] = (value * i16::MAX as f32) as i16;
            }
        }
    }
}

fn interleaved_info(channels: u16, sample_rate: u32, total: usize) -> Result<ChunkInfo> {
    if channels == 0 {
        return Err(Error::InvalidFrame("audio chunk with zero channels".into()));
    }
    if total % channels as usize != 0 {
        return Err(Error::InvalidFrame(format!(
            "{total} interleaved samples do not divide into {channels} channels"
        )));
    }
    Ok(ChunkInfo {
        len: total / channels as usize,
        channels,
        sample_rate,
    })
}

fn planar_info(sample_rate: u32, lens: &[usize]) -> Result<ChunkInfo> {
    let Some(&len) = lens.first() else {
        return Err(Error::InvalidFrame("audio chunk with zero channels".into()));
    };
    if lens.iter().any(|&l| l != len) {
        return Err(Error::InvalidFrame(
            "non-interleaved channels differ in length".into(),
        ));
    }
    let channels = u16::try_from(lens.len())
        .map_err(|_| Error::InvalidFrame(format!("too many channels: {}", lens.len())))?;
    Ok(ChunkInfo {
        len,
        channels,
        sample_rate,
    })
}
