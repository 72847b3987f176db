//! Sources reading raw frames from the stdout of a command
//!
//! The command is spawned on `open` and terminated on `close`. Each `read`
//! consumes exactly one frame worth of bytes; a stall longer than the read
//! timeout ends the stream.

use crate::driver::{Adapter, AudioAdapter, VideoAdapter};
use crate::error::{Error, Result};
use crate::media::{
    AudioChunk, AudioProperties, AudioReader, FrameReader, MediaProperties, Release, SampleFormat,
    VideoFrame, VideoProperties, VideoReader,
};
use crate::process::{OutputStream, ProcessHost};
use crate::source::color::RawVideoFormat;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Process plumbing shared by the audio and video command sources
struct CommandProcess {
    command: String,
    label: String,
    show_stderr: bool,
    read_timeout: Duration,
    host: Option<ProcessHost>,
}

impl CommandProcess {
    fn new(command: &str, label: &str) -> Self {
        Self {
            command: command.to_string(),
            label: label.to_string(),
            show_stderr: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            host: None,
        }
    }

    fn open(&mut self) -> Result<()> {
        let mut host = ProcessHost::new(&self.command)?;
        host.open_stdout()?;
        if self.show_stderr {
            host.open_stderr()?;
            let prefix = OutputStream::Stderr.prefix(&self.label, host.program());
            host.forward_output(OutputStream::Stderr, prefix)?;
        }
        host.start()?;
        self.host = Some(host);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.host.take() {
            Some(mut host) => host.close().await,
            None => Ok(()),
        }
    }

    fn frames(&mut self, frame_size: usize) -> Result<RawFrames> {
        if frame_size == 0 {
            return Err(Error::Config("frame size must not be zero".into()));
        }
        let host = self
            .host
            .as_mut()
            .ok_or_else(|| Error::Device(format!("{} is not open", self.label)))?;
        let stdout = host
            .take_stdout()
            .ok_or_else(|| Error::Device(format!("{} is already recording", self.label)))?;
        Ok(RawFrames {
            stdout,
            frame_size,
            timeout: self.read_timeout,
        })
    }
}

/// Fixed-size frames cut from a stdout pipe
struct RawFrames {
    stdout: ChildStdout,
    frame_size: usize,
    timeout: Duration,
}

impl RawFrames {
    async fn next(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.frame_size);
        match tokio::time::timeout(self.timeout, self.stdout.read_exact(&mut buf)).await {
            Ok(Ok(_)) => Ok(buf.freeze()),
            Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::EndOfStream),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::Upstream(format!(
                "no frame from source within {:?}",
                self.timeout
            ))),
        }
    }
}

/// Audio adapter decoding little-endian interleaved samples (`s16le`, `f32le`)
pub struct CommandAudioSource {
    process: CommandProcess,
    properties: AudioProperties,
}

impl CommandAudioSource {
    pub fn new(command: &str, label: &str, properties: AudioProperties) -> Self {
        Self {
            process: CommandProcess::new(command, label),
            properties,
        }
    }

    pub fn with_stderr(mut self, show: bool) -> Self {
        self.process.show_stderr = show;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.process.read_timeout = timeout;
        self
    }
}

#[async_trait]
impl Adapter for CommandAudioSource {
    async fn open(&mut self) -> Result<()> {
        self.process.open()
    }

    async fn close(&mut self) -> Result<()> {
        self.process.close().await
    }

    fn properties(&self) -> Vec<MediaProperties> {
        vec![MediaProperties::audio(&self.process.label, self.properties.clone())]
    }
}

#[async_trait]
impl AudioAdapter for CommandAudioSource {
    async fn audio_record(&mut self, _props: MediaProperties) -> Result<AudioReader> {
        let props = &self.properties;
        let format: SampleFormat = props.sample_format.parse()?;
        if !format.is_interleaved() {
            return Err(Error::Config(format!("command sources emit interleaved audio, not {format}")));
        }
        if props.channel_count == 0 {
            return Err(Error::Config("channel count must not be zero".into()));
        }
        let frame_size = props.samples_per_chunk * props.channel_count as usize * format.bytes_per_sample();
        let frames = self.process.frames(frame_size)?;
        Ok(Box::new(CommandAudioReader {
            frames,
            format,
            channels: props.channel_count,
            sample_rate: props.sample_rate,
        }))
    }
}

struct CommandAudioReader {
    frames: RawFrames,
    format: SampleFormat,
    channels: u16,
    sample_rate: u32,
}

#[async_trait]
impl FrameReader for CommandAudioReader {
    type Frame = AudioChunk;

    async fn read(&mut self) -> Result<(AudioChunk, Release)> {
        let raw = self.frames.next().await?;
        let chunk = match self.format {
            SampleFormat::Float32Interleaved => {
                let data = raw
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                AudioChunk::float32_interleaved(self.channels, self.sample_rate, data)?
            }
            _ => {
                let data = raw
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]))
                    .collect();
                AudioChunk::int16_interleaved(self.channels, self.sample_rate, data)?
            }
        };
        Ok((chunk, Release::noop()))
    }
}

/// Video adapter cutting raw I420 or RGBA frames
pub struct CommandVideoSource {
    process: CommandProcess,
    properties: VideoProperties,
}

impl CommandVideoSource {
    pub fn new(command: &str, label: &str, properties: VideoProperties) -> Self {
        Self {
            process: CommandProcess::new(command, label),
            properties,
        }
    }

    pub fn with_stderr(mut self, show: bool) -> Self {
        self.process.show_stderr = show;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.process.read_timeout = timeout;
        self
    }
}

#[async_trait]
impl Adapter for CommandVideoSource {
    async fn open(&mut self) -> Result<()> {
        self.process.open()
    }

    async fn close(&mut self) -> Result<()> {
        self.process.close().await
    }

    fn properties(&self) -> Vec<MediaProperties> {
        vec![MediaProperties::video(&self.process.label, self.properties.clone())]
    }
}

#[async_trait]
impl VideoAdapter for CommandVideoSource {
    async fn video_record(&mut self, _props: MediaProperties) -> Result<VideoReader> {
        let format = RawVideoFormat::parse(&self.properties.frame_format)?;
        let (width, height) = (self.properties.width, self.properties.height);
        let frames = self.process.frames(format.frame_size(width, height))?;
        Ok(Box::new(CommandVideoReader {
            frames,
            format,
            width,
            height,
        }))
    }
}

struct CommandVideoReader {
    frames: RawFrames,
    format: RawVideoFormat,
    width: u32,
    height: u32,
}

#[async_trait]
impl FrameReader for CommandVideoReader {
    type Frame = VideoFrame;

    async fn read(&mut self) -> Result<(VideoFrame, Release)> {
        let raw = self.frames.next().await?;
        let frame = self.format.frame(self.width, self.height, raw)?;
        Ok((frame, Release::noop()))
    }
}
