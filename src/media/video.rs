//! In-memory video frame representations
//!
//! Buffers are tightly packed (stride equals row width) and held in
//! [`Bytes`] so frames can be handed downstream without copying.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Chroma subsampling of a planar Y'CbCr frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsampleRatio {
    Ratio444,
    Ratio422,
    Ratio420,
    Ratio440,
    Ratio411,
    Ratio410,
}

impl SubsampleRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsampleRatio::Ratio444 => "4:4:4",
            SubsampleRatio::Ratio422 => "4:2:2",
            SubsampleRatio::Ratio420 => "4:2:0",
            SubsampleRatio::Ratio440 => "4:4:0",
            SubsampleRatio::Ratio411 => "4:1:1",
            SubsampleRatio::Ratio410 => "4:1:0",
        }
    }

    /// Horizontal and vertical chroma decimation factors
    pub fn factors(&self) -> (u32, u32) {
        match self {
            SubsampleRatio::Ratio444 => (1, 1),
            SubsampleRatio::Ratio422 => (2, 1),
            SubsampleRatio::Ratio420 => (2, 2),
            SubsampleRatio::Ratio440 => (1, 2),
            SubsampleRatio::Ratio411 => (4, 1),
            SubsampleRatio::Ratio410 => (4, 2),
        }
    }

    /// Dimensions of each chroma plane for a `width` x `height` frame
    pub fn chroma_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (fx, fy) = self.factors();
        (width.div_ceil(fx), height.div_ceil(fy))
    }
}

impl std::fmt::Display for SubsampleRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single-plane pixel layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackedFormat {
    Cmyk,
    Rgba,
    Nrgba,
    /// 16 bits per channel, big-endian byte pairs
    Rgba64,
    /// 16 bits per channel, big-endian byte pairs
    Nrgba64,
    Gray,
    /// big-endian byte pairs
    Gray16,
    Alpha,
    /// big-endian byte pairs
    Alpha16,
}

impl PackedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackedFormat::Cmyk => "CMYK",
            PackedFormat::Rgba => "RGBA",
            PackedFormat::Nrgba => "NRGBA",
            PackedFormat::Rgba64 => "RGBA64",
            PackedFormat::Nrgba64 => "NRGBA64",
            PackedFormat::Gray => "Gray",
            PackedFormat::Gray16 => "Gray16",
            PackedFormat::Alpha => "Alpha",
            PackedFormat::Alpha16 => "Alpha16",
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PackedFormat::Gray | PackedFormat::Alpha => 1,
            PackedFormat::Gray16 | PackedFormat::Alpha16 => 2,
            PackedFormat::Cmyk | PackedFormat::Rgba | PackedFormat::Nrgba => 4,
            PackedFormat::Rgba64 | PackedFormat::Nrgba64 => 8,
        }
    }
}

/// Pixel storage of a [`VideoFrame`]
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// Planar luma plus two chroma planes
    YCbCr {
        ratio: SubsampleRatio,
        y: Bytes,
        cb: Bytes,
        cr: Bytes,
    },
    Packed { format: PackedFormat, data: Bytes },
    /// One palette index per pixel
    Paletted { indices: Bytes, palette: Vec<[u8; 4]> },
}

/// One image pulled from a video reader
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    pixels: Pixels,
}

impl VideoFrame {
    pub fn ycbcr(
        width: u32,
        height: u32,
        ratio: SubsampleRatio,
        y: impl Into<Bytes>,
        cb: impl Into<Bytes>,
        cr: impl Into<Bytes>,
    ) -> Result<Self> {
        let (y, cb, cr) = (y.into(), cb.into(), cr.into());
        let (cw, ch) = ratio.chroma_size(width, height);
        expect_len("Y", y.len(), width as usize * height as usize)?;
        expect_len("Cb", cb.len(), cw as usize * ch as usize)?;
        expect_len("Cr", cr.len(), cw as usize * ch as usize)?;
        Ok(Self {
            width,
            height,
            pixels: Pixels::YCbCr { ratio, y, cb, cr },
        })
    }

    pub fn packed(width: u32, height: u32, format: PackedFormat, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        expect_len(
            format.as_str(),
            data.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
        )?;
        Ok(Self {
            width,
            height,
            pixels: Pixels::Packed { format, data },
        })
    }

    pub fn paletted(
        width: u32,
        height: u32,
        indices: impl Into<Bytes>,
        palette: Vec<[u8; 4]>,
    ) -> Result<Self> {
        let indices = indices.into();
        expect_len("palette index", indices.len(), width as usize * height as usize)?;
        Ok(Self {
            width,
            height,
            pixels: Pixels::Paletted { indices, palette },
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    /// Y'CbCr sample at `(x, y)`, if this is a planar frame
    pub fn ycbcr_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        let Pixels::YCbCr { ratio, y: luma, cb, cr } = &self.pixels else {
            return None;
        };
        if x >= self.width || y >= self.height {
            return None;
        }
        let (fx, fy) = ratio.factors();
        let (cw, _) = ratio.chroma_size(self.width, self.height);
        let ci = (y / fy) as usize * cw as usize + (x / fx) as usize;
        let yi = y as usize * self.width as usize + x as usize;
        Some((luma[yi], cb[ci], cr[ci]))
    }
}

fn expect_len(plane: &str, got: usize, want: usize) -> Result<()> {
    if got != want {
        return Err(Error::InvalidFrame(format!(
            "{plane} plane holds {got} bytes, expected {want}"
        )));
    }
    Ok(())
}
