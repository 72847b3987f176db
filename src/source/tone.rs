//! Sine tone test source

use crate::driver::{Adapter, AudioAdapter};
use crate::error::{Error, Result};
use crate::media::{
    AudioChunk, AudioProperties, AudioReader, ChunkInfo, FrameReader, MediaProperties, Release,
    SampleFormat,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

const DEVICE_ID: &str = "tone";

/// Audio adapter producing a sine wave
pub struct ToneSource {
    frequency: f32,
    amplitude: f32,
    defaults: AudioProperties,
    paced: bool,
    /// Shared with live readers so `close` ends them
    open: Arc<AtomicBool>,
}

impl ToneSource {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            amplitude: 0.5,
            defaults: AudioProperties {
                channel_count: 2,
                sample_rate: 48000,
                samples_per_chunk: 960,
                sample_format: SampleFormat::Int16Interleaved.as_str().to_string(),
            },
            paced: false,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Defaults used for every field `record` leaves unset
    pub fn with_properties(mut self, props: AudioProperties) -> Self {
        self.defaults = merge(&self.defaults, &props);
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Emit chunks at the rate a real device would
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }
}

fn merge(base: &AudioProperties, requested: &AudioProperties) -> AudioProperties {
    AudioProperties {
        channel_count: if requested.channel_count > 0 { requested.channel_count } else { base.channel_count },
        sample_rate: if requested.sample_rate > 0 { requested.sample_rate } else { base.sample_rate },
        samples_per_chunk: if requested.samples_per_chunk > 0 {
            requested.samples_per_chunk
        } else {
            base.samples_per_chunk
        },
        sample_format: if requested.sample_format.is_empty() {
            base.sample_format.clone()
        } else {
            requested.sample_format.clone()
        },
    }
}

#[async_trait]
impl Adapter for ToneSource {
    async fn open(&mut self) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn properties(&self) -> Vec<MediaProperties> {
        vec![MediaProperties::audio(DEVICE_ID, self.defaults.clone())]
    }
}

#[async_trait]
impl AudioAdapter for ToneSource {
    async fn audio_record(&mut self, props: MediaProperties) -> Result<AudioReader> {
        let props = merge(&self.defaults, &props.audio);
        let format: SampleFormat = props.sample_format.parse()?;
        if props.channel_count == 0 || props.sample_rate == 0 || props.samples_per_chunk == 0 {
            return Err(Error::Config(format!("unusable tone properties {props:?}")));
        }

        let info = ChunkInfo {
            len: props.samples_per_chunk,
            channels: props.channel_count,
            sample_rate: props.sample_rate,
        };
        let ticker = self.paced.then(|| {
            let period = Duration::from_secs_f64(info.len as f64 / info.sample_rate as f64);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        log::info!(
            "tone {} Hz: {} ch, {} Hz, {} samples/chunk, {}",
            self.frequency,
            info.channels,
            info.sample_rate,
            info.len,
            format
        );
        Ok(Box::new(ToneReader {
            frequency: self.frequency,
            amplitude: self.amplitude,
            format,
            info,
            position: 0,
            ticker,
            open: Arc::clone(&self.open),
        }))
    }
}

struct ToneReader {
    frequency: f32,
    amplitude: f32,
    format: SampleFormat,
    info: ChunkInfo,
    /// Index of the next sample since recording started
    position: u64,
    ticker: Option<Interval>,
    open: Arc<AtomicBool>,
}

#[async_trait]
impl FrameReader for ToneReader {
    type Frame = AudioChunk;

    async fn read(&mut self) -> Result<(AudioChunk, Release)> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(Error::EndOfStream);
        }
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.tick().await;
        }

        let mut chunk = AudioChunk::silence(self.format, self.info);
        let step = std::f64::consts::TAU * self.frequency as f64 / self.info.sample_rate as f64;
        for i in 0..self.info.len {
            let value = ((self.position + i as u64) as f64 * step).sin() as f32 * self.amplitude;
            for channel in 0..self.info.channels as usize {
                chunk.set_normalized(i, channel, value);
            }
        }
        self.position += self.info.len as u64;

        Ok((chunk, Release::noop()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tone_formats() {
        let mut source = ToneSource::new(440.0);
        source.open().await.unwrap();

        for format in ["Int16Interleaved", "Float32Interleaved", "Int16NonInterleaved", "f32lep"] {
            let props = MediaProperties::audio(
                DEVICE_ID,
                AudioProperties {
                    sample_format: format.into(),
                    samples_per_chunk: 64,
                    ..Default::default()
                },
            );
            let mut reader = source.audio_record(props).await.unwrap();
            let (chunk, _) = reader.read().await.unwrap();
            let info = chunk.info();
            assert_eq!(info.len, 64);
            assert_eq!(info.channels, 2);
            assert_eq!(info.sample_rate, 48000);
        }
    }

    #[tokio::test]
    async fn test_tone_starts_at_zero_and_continues() {
        let mut source = ToneSource::new(1000.0).with_amplitude(1.0);
        source.open().await.unwrap();
        let props = MediaProperties::audio(
            DEVICE_ID,
            AudioProperties {
                channel_count: 1,
                sample_rate: 8000,
                samples_per_chunk: 4,
                sample_format: "Float32Interleaved".into(),
            },
        );
        let mut reader = source.audio_record(props).await.unwrap();
        let (first, _) = reader.read().await.unwrap();
        let (second, _) = reader.read().await.unwrap();
        let (AudioChunk::Float32Interleaved { data: a, .. }, AudioChunk::Float32Interleaved { data: b, .. }) =
            (first, second)
        else {
            panic!("unexpected layout");
        };
        assert_eq!(a[0], 0.0);
        // 1 kHz at 8 kHz: sample 2 is the crest, sample 6 the trough
        assert!((a[2] - 1.0).abs() < 1e-6);
        assert!((b[2] + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_close_ends_reader() {
        let mut source = ToneSource::new(440.0);
        source.open().await.unwrap();
        let mut reader = source.audio_record(MediaProperties::default()).await.unwrap();
        reader.read().await.unwrap();
        source.close().await.unwrap();
        assert!(reader.read().await.unwrap_err().is_end_of_stream());
    }

    #[tokio::test]
    async fn test_unknown_format() {
        let mut source = ToneSource::new(440.0);
        let props = MediaProperties::audio(
            DEVICE_ID,
            AudioProperties {
                sample_format: "u8".into(),
                ..Default::default()
            },
        );
        assert!(matches!(source.audio_record(props).await, Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_reads() {
        let mut source = ToneSource::new(440.0).paced(true);
        source.open().await.unwrap();
        let props = MediaProperties::audio(
            DEVICE_ID,
            AudioProperties {
                sample_rate: 1000,
                samples_per_chunk: 100,
                ..Default::default()
            },
        );
        let mut reader = source.audio_record(props).await.unwrap();
        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            reader.read().await.unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(300));
    }
}
