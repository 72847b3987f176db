//! Solid colour test source

use crate::driver::{Adapter, VideoAdapter};
use crate::error::{Error, Result};
use crate::media::{
    FrameReader, MediaProperties, PackedFormat, Release, SubsampleRatio, VideoFrame, VideoProperties,
    VideoReader,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

const DEVICE_ID: &str = "color";

/// Raw layouts a test or command source can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawVideoFormat {
    /// Planar Y'CbCr 4:2:0
    I420,
    Rgba,
}

impl RawVideoFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "i420" | "yuv420p" => Ok(RawVideoFormat::I420),
            "rgba" => Ok(RawVideoFormat::Rgba),
            other => Err(Error::Config(format!("unsupported raw video format {other:?}"))),
        }
    }

    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        match self {
            RawVideoFormat::I420 => {
                let (cw, ch) = SubsampleRatio::Ratio420.chroma_size(width, height);
                width as usize * height as usize + 2 * (cw as usize * ch as usize)
            }
            RawVideoFormat::Rgba => width as usize * height as usize * 4,
        }
    }

    /// Build a frame over one raw buffer of [`frame_size`](Self::frame_size) bytes
    pub fn frame(&self, width: u32, height: u32, raw: Bytes) -> Result<VideoFrame> {
        match self {
            RawVideoFormat::I420 => {
                let luma = width as usize * height as usize;
                let (cw, ch) = SubsampleRatio::Ratio420.chroma_size(width, height);
                let chroma = cw as usize * ch as usize;
                if raw.len() != luma + 2 * chroma {
                    return Err(Error::InvalidFrame(format!(
                        "I420 {width}x{height} needs {} bytes, got {}",
                        luma + 2 * chroma,
                        raw.len()
                    )));
                }
                VideoFrame::ycbcr(
                    width,
                    height,
                    SubsampleRatio::Ratio420,
                    raw.slice(..luma),
                    raw.slice(luma..luma + chroma),
                    raw.slice(luma + chroma..),
                )
            }
            RawVideoFormat::Rgba => VideoFrame::packed(width, height, PackedFormat::Rgba, raw),
        }
    }
}

/// Video adapter producing frames of a single colour
pub struct ColorSource {
    rgb: [u8; 3],
    defaults: VideoProperties,
    paced: bool,
    open: Arc<AtomicBool>,
}

impl ColorSource {
    pub fn new(rgb: [u8; 3]) -> Self {
        Self {
            rgb,
            defaults: VideoProperties {
                width: 320,
                height: 240,
                frame_format: "I420".to_string(),
                frame_rate: 30.0,
            },
            paced: false,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_properties(mut self, props: VideoProperties) -> Self {
        self.defaults = merge(&self.defaults, &props);
        self
    }

    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    fn raw_frame(&self, format: RawVideoFormat, width: u32, height: u32) -> Bytes {
        let [r, g, b] = self.rgb;
        match format {
            RawVideoFormat::I420 => {
                let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
                let luma = width as usize * height as usize;
                let (cw, ch) = SubsampleRatio::Ratio420.chroma_size(width, height);
                let chroma = cw as usize * ch as usize;
                let mut raw = Vec::with_capacity(luma + 2 * chroma);
                raw.resize(luma, y);
                raw.resize(luma + chroma, cb);
                raw.resize(luma + 2 * chroma, cr);
                Bytes::from(raw)
            }
            RawVideoFormat::Rgba => {
                let pixels = width as usize * height as usize;
                Bytes::from([r, g, b, 255].repeat(pixels))
            }
        }
    }
}

fn merge(base: &VideoProperties, requested: &VideoProperties) -> VideoProperties {
    VideoProperties {
        width: if requested.width > 0 { requested.width } else { base.width },
        height: if requested.height > 0 { requested.height } else { base.height },
        frame_format: if requested.frame_format.is_empty() {
            base.frame_format.clone()
        } else {
            requested.frame_format.clone()
        },
        frame_rate: if requested.frame_rate > 0.0 { requested.frame_rate } else { base.frame_rate },
    }
}

/// BT.601 full range
fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    (clamp(y), clamp(cb), clamp(cr))
}

#[async_trait]
impl Adapter for ColorSource {
    async fn open(&mut self) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn properties(&self) -> Vec<MediaProperties> {
        vec![MediaProperties::video(DEVICE_ID, self.defaults.clone())]
    }
}

#[async_trait]
impl VideoAdapter for ColorSource {
    async fn video_record(&mut self, props: MediaProperties) -> Result<VideoReader> {
        let props = merge(&self.defaults, &props.video);
        let format = RawVideoFormat::parse(&props.frame_format)?;
        if props.width == 0 || props.height == 0 {
            return Err(Error::Config(format!("unusable frame size {}x{}", props.width, props.height)));
        }

        // every frame shares this buffer
        let frame = format.frame(props.width, props.height, self.raw_frame(format, props.width, props.height))?;
        let ticker = (self.paced && props.frame_rate > 0.0).then(|| {
            let mut ticker = tokio::time::interval(Duration::from_secs_f32(1.0 / props.frame_rate));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        log::info!(
            "colour source {:?}: {}x{} {:?} @ {} fps",
            self.rgb,
            props.width,
            props.height,
            format,
            props.frame_rate
        );
        Ok(Box::new(ColorReader {
            frame,
            ticker,
            open: Arc::clone(&self.open),
        }))
    }
}

struct ColorReader {
    frame: VideoFrame,
    ticker: Option<Interval>,
    open: Arc<AtomicBool>,
}

#[async_trait]
impl FrameReader for ColorReader {
    type Frame = VideoFrame;

    async fn read(&mut self) -> Result<(VideoFrame, Release)> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(Error::EndOfStream);
        }
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.tick().await;
        }
        Ok((self.frame.clone(), Release::noop()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Pixels;

    #[test]
    fn test_rgb_to_ycbcr() {
        assert_eq!(rgb_to_ycbcr(0, 0, 0), (0, 128, 128));
        assert_eq!(rgb_to_ycbcr(255, 255, 255), (255, 128, 128));
        let (_, _, cr) = rgb_to_ycbcr(255, 0, 0);
        assert_eq!(cr, 255);
    }

    #[test]
    fn test_raw_format_sizes() {
        assert_eq!(RawVideoFormat::I420.frame_size(4, 2), 8 + 2 + 2);
        assert_eq!(RawVideoFormat::I420.frame_size(3, 3), 9 + 4 + 4);
        assert_eq!(RawVideoFormat::Rgba.frame_size(2, 2), 16);
        assert!(RawVideoFormat::parse("nv12").is_err());
        assert!(RawVideoFormat::I420.frame(4, 2, Bytes::from(vec![0u8; 11])).is_err());
    }

    #[test]
    fn test_raw_format_sizes_beyond_u32() {
        assert_eq!(RawVideoFormat::Rgba.frame_size(40_000, 30_000), 4_800_000_000);
        assert_eq!(
            RawVideoFormat::I420.frame_size(40_000, 30_000),
            1_200_000_000 + 2 * 300_000_000
        );
        assert!(RawVideoFormat::I420.frame(40_000, 30_000, Bytes::new()).is_err());
    }

    #[tokio::test]
    async fn test_i420_frames() {
        let mut source = ColorSource::new([255, 255, 255]);
        source.open().await.unwrap();
        let props = MediaProperties::video(
            DEVICE_ID,
            VideoProperties {
                width: 4,
                height: 2,
                ..Default::default()
            },
        );
        let mut reader = source.video_record(props).await.unwrap();
        let (frame, _) = reader.read().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert_eq!(frame.ycbcr_at(3, 1), Some((255, 128, 128)));
    }

    #[tokio::test]
    async fn test_rgba_frames_share_buffer() {
        let mut source = ColorSource::new([1, 2, 3]);
        source.open().await.unwrap();
        let props = MediaProperties::video(
            DEVICE_ID,
            VideoProperties {
                width: 2,
                height: 2,
                frame_format: "RGBA".into(),
                frame_rate: 0.0,
            },
        );
        let mut reader = source.video_record(props).await.unwrap();
        let (a, _) = reader.read().await.unwrap();
        let (b, _) = reader.read().await.unwrap();
        let (Pixels::Packed { data: da, .. }, Pixels::Packed { data: db, .. }) = (a.pixels(), b.pixels()) else {
            panic!("expected packed frames");
        };
        assert_eq!(&da[..4], &[1, 2, 3, 255]);
        assert_eq!(da.as_ptr(), db.as_ptr());

        source.close().await.unwrap();
        assert!(reader.read().await.unwrap_err().is_end_of_stream());
    }
}
