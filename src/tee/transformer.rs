//! Tee transform: mirror every pulled frame to a process's stdin

use crate::config::{StartPolicy, TeeConfig};
use crate::error::Result;
use crate::media::{AudioChunk, FrameReader, Release, VideoFrame};
use crate::process::{EnvironmentVariables, OutputStream, ProcessHost, ProcessState};
use crate::serialize::FrameMetadata;
use crate::tee::frame::TeeFrame;
use crate::tee::stats::TeeStats;
use async_trait::async_trait;
use std::marker::PhantomData;

pub type AudioTeeTransformer = TeeTransformer<AudioChunk>;
pub type VideoTeeTransformer = TeeTransformer<VideoFrame>;

/// A configured tee process waiting for the reader it will mirror
pub struct TeeTransformer<F> {
    host: ProcessHost,
    label: String,
    _frame: PhantomData<fn() -> F>,
}

impl<F: TeeFrame> TeeTransformer<F> {
    /// Prepare the process: stdin always, stdout/stderr forwarded on request.
    ///
    /// Under [`StartPolicy::Immediate`] the process is started here and any
    /// spawn failure is returned.
    pub fn new(config: &TeeConfig) -> Result<Self> {
        let mut host = ProcessHost::new(&config.command)?.with_close_timeout(config.close_timeout());
        let program = host.program().to_string();

        host.open_stdin()?;
        if config.show_stdout {
            host.open_stdout()?;
            host.forward_output(
                OutputStream::Stdout,
                OutputStream::Stdout.prefix(&config.label, &program),
            )?;
        }
        if config.show_stderr {
            host.open_stderr()?;
            host.forward_output(
                OutputStream::Stderr,
                OutputStream::Stderr.prefix(&config.label, &program),
            )?;
        }

        if config.start == StartPolicy::Immediate {
            host.start()?;
        }

        log::debug!("{}: {} tee prepared for `{}`", config.label, F::KIND, host.spec());
        Ok(Self {
            host,
            label: config.label.clone(),
            _frame: PhantomData,
        })
    }

    pub fn process(&self) -> &ProcessHost {
        &self.host
    }

    /// Wrap `upstream`; the returned reader owns the process
    pub fn apply<R>(self, upstream: R) -> TeeReader<R>
    where
        R: FrameReader<Frame = F>,
    {
        TeeReader {
            upstream,
            host: self.host,
            label: self.label,
            environment: None,
            metadata: None,
            stats: TeeStats::new(),
        }
    }
}

pub fn create_audio_tee_transformer(
    command: &str,
    label: &str,
    show_stdout: bool,
    show_stderr: bool,
) -> Result<AudioTeeTransformer> {
    TeeTransformer::new(&tee_config(command, label, show_stdout, show_stderr))
}

pub fn create_video_tee_transformer(
    command: &str,
    label: &str,
    show_stdout: bool,
    show_stderr: bool,
) -> Result<VideoTeeTransformer> {
    TeeTransformer::new(&tee_config(command, label, show_stdout, show_stderr))
}

fn tee_config(command: &str, label: &str, show_stdout: bool, show_stderr: bool) -> TeeConfig {
    TeeConfig::new(command)
        .with_label(label)
        .with_show_stdout(show_stdout)
        .with_show_stderr(show_stderr)
}

/// Reader yielding upstream's frames unchanged while writing their raw bytes
/// to the tee process
pub struct TeeReader<R> {
    upstream: R,
    host: ProcessHost,
    label: String,
    /// Set on the first successful pull, never changed afterwards
    environment: Option<EnvironmentVariables>,
    metadata: Option<FrameMetadata>,
    stats: TeeStats,
}

impl<R> TeeReader<R>
where
    R: FrameReader,
    R::Frame: TeeFrame,
{
    /// Environment derived from the first frame, once one was read
    pub fn environment(&self) -> Option<&EnvironmentVariables> {
        self.environment.as_ref()
    }

    pub fn metadata(&self) -> Option<&FrameMetadata> {
        self.metadata.as_ref()
    }

    pub fn process(&self) -> &ProcessHost {
        &self.host
    }

    pub fn stats(&self) -> TeeStats {
        self.stats.clone()
    }

    /// Stop mirroring and terminate the process
    pub async fn close(&mut self) -> Result<()> {
        self.host.close().await
    }

    async fn mirror(&mut self, frame: &R::Frame) -> Result<()> {
        let (bytes, metadata) = frame.to_raw()?;

        if self.environment.is_none() {
            let env = metadata.environment()?;
            log::info!("{}: tee environment {:?}", self.label, env);
            self.host.set_env(&env);
            if self.host.state() == ProcessState::Configured {
                self.host.start()?;
            }
            self.environment = Some(env);
            self.metadata = Some(metadata);
        }

        self.host.write_stdin(&bytes).await?;
        self.stats.record_frame(bytes.len());
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.stats.record_failure();
        if let Err(e) = self.host.close().await {
            log::warn!("{}: failed to close tee process: {}", self.label, e);
        }
    }
}

#[async_trait]
impl<R> FrameReader for TeeReader<R>
where
    R: FrameReader,
    R::Frame: TeeFrame,
{
    type Frame = R::Frame;

    async fn read(&mut self) -> Result<(R::Frame, Release)> {
        // upstream's release callback is dropped, not invoked
        let (frame, _release) = match self.upstream.read().await {
            Ok(pulled) => pulled,
            Err(e) => {
                log::debug!("{}: upstream ended: {}", self.label, e);
                self.shutdown().await;
                return Err(e);
            }
        };

        if let Err(e) = self.mirror(&frame).await {
            log::error!("{}: tee failed: {}", self.label, e);
            self.shutdown().await;
            return Err(e);
        }

        Ok((frame, Release::noop()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::media::{PackedFormat, Pixels, QueueReader};
    use bytes::Bytes;

    fn stereo_chunk(value: i16) -> AudioChunk {
        AudioChunk::int16_interleaved(2, 44100, vec![value; 8]).unwrap()
    }

    #[test]
    fn test_invalid_command() {
        assert!(matches!(
            create_audio_tee_transformer("", "t", false, false),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_immediate_spawn_failure() {
        let config = TeeConfig::new("no-such-tee-binary-0815").with_start(StartPolicy::Immediate);
        assert!(matches!(
            AudioTeeTransformer::new(&config),
            Err(Error::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_policies() {
        let deferred = create_video_tee_transformer("cat", "t", false, false).unwrap();
        assert_eq!(deferred.process().state(), ProcessState::Configured);

        let config = TeeConfig::new("cat").with_start(StartPolicy::Immediate);
        let mut eager = VideoTeeTransformer::new(&config).unwrap().apply(QueueReader::new(Vec::<VideoFrame>::new()));
        assert_eq!(eager.process().state(), ProcessState::Running);
        eager.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_passthrough_identity() {
        let data = Bytes::from(vec![7u8; 4 * 4 * 4]);
        let frame = VideoFrame::packed(4, 4, PackedFormat::Rgba, data.clone()).unwrap();
        let upstream = QueueReader::new([frame.clone()]);

        let transformer = create_video_tee_transformer("sh -c 'cat > /dev/null'", "t", false, true).unwrap();
        let mut reader = transformer.apply(upstream);
        let (out, release) = reader.read().await.unwrap();

        assert_eq!(out, frame);
        let Pixels::Packed { data: out_data, .. } = out.pixels() else {
            panic!("expected packed pixels");
        };
        assert_eq!(out_data.as_ptr(), data.as_ptr());
        assert!(release.is_noop());
        assert_eq!(reader.stats().bytes(), 64);
        reader.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_environment_set_once() {
        let upstream = QueueReader::new([
            stereo_chunk(1),
            AudioChunk::int16_interleaved(1, 8000, vec![0; 3]).unwrap(),
            stereo_chunk(3),
        ]);
        let mut reader = create_audio_tee_transformer("sh -c 'cat > /dev/null'", "t", false, false)
            .unwrap()
            .apply(upstream);
        assert!(reader.environment().is_none());

        for _ in 0..3 {
            reader.read().await.unwrap();
            let env = reader.environment().unwrap();
            assert_eq!(env.get("SAMPLINGRATE"), Some("44100"));
            assert_eq!(env.get("CHANNELS"), Some("2"));
            assert_eq!(env.get("LEN"), Some("4"));
        }
        assert_eq!(reader.process().environment().get("SAMPLE_FORMAT"), Some("Int16Interleaved"));
        assert_eq!(reader.stats().frames(), 3);
        reader.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_upstream_error_closes_process() {
        let upstream = QueueReader::from_results([
            Ok(stereo_chunk(1)),
            Err(Error::Upstream("device lost".into())),
        ]);
        let mut reader = create_audio_tee_transformer("cat", "t", true, false)
            .unwrap()
            .apply(upstream);

        reader.read().await.unwrap();
        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, Error::Upstream(ref msg) if msg == "device lost"));
        assert_eq!(reader.process().state(), ProcessState::Closed);
        assert_eq!(reader.stats().frames(), 1);
        assert_eq!(reader.stats().failures(), 1);
    }

    #[tokio::test]
    async fn test_end_of_stream_before_first_frame() {
        let mut reader = create_audio_tee_transformer("cat", "t", false, false)
            .unwrap()
            .apply(QueueReader::new(Vec::<AudioChunk>::new()));
        assert!(reader.read().await.unwrap_err().is_end_of_stream());
        assert!(reader.environment().is_none());
        assert_eq!(reader.process().state(), ProcessState::Closed);
    }

    #[tokio::test]
    async fn test_unsupported_frame_closes_process() {
        let frame = VideoFrame::paletted(1, 1, vec![0u8], vec![[1, 2, 3, 255]]).unwrap();
        let mut reader = create_video_tee_transformer("cat", "t", false, false)
            .unwrap()
            .apply(QueueReader::new([frame]));
        assert!(matches!(
            reader.read().await,
            Err(Error::UnsupportedFormat(_))
        ));
        assert_eq!(reader.process().state(), ProcessState::Closed);
    }

    #[tokio::test]
    async fn test_deferred_spawn_failure_fails_first_read() {
        let mut reader = create_audio_tee_transformer("no-such-tee-binary-0815", "t", false, false)
            .unwrap()
            .apply(QueueReader::new([stereo_chunk(0)]));
        assert!(matches!(reader.read().await, Err(Error::Spawn { .. })));
        assert_eq!(reader.process().state(), ProcessState::Closed);
    }
}
