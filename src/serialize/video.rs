//! Raw video layout: planar frames as Y, Cb, Cr planes back to back;
//! packed frames as their pixel array untouched

use crate::error::{Error, Result};
use crate::media::{Pixels, VideoFrame};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Describes the raw buffer produced from a video frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Layout name, e.g. `"YCbCr"` or `"RGBA"`
    #[serde(rename = "pixFormat")]
    pub pix_format: String,
    /// `"4:2:0"` etc., empty when the format has no chroma subsampling
    #[serde(rename = "pixSubsampleRatio")]
    pub pix_subsample_ratio: String,
}

pub fn serialize_video(frame: &VideoFrame) -> Result<(Bytes, VideoMetadata)> {
    let (bytes, pix_format, pix_subsample_ratio) = match frame.pixels() {
        Pixels::YCbCr { ratio, y, cb, cr } => {
            let mut buf = BytesMut::with_capacity(y.len() + cb.len() + cr.len());
            buf.put_slice(y);
            buf.put_slice(cb);
            buf.put_slice(cr);
            (buf.freeze(), "YCbCr".to_string(), ratio.as_str().to_string())
        }
        // shares the frame's buffer
        Pixels::Packed { format, data } => (data.clone(), format.as_str().to_string(), String::new()),
        Pixels::Paletted { .. } => {
            return Err(Error::UnsupportedFormat("Paletted".into()));
        }
    };

    Ok((
        bytes,
        VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            pix_format,
            pix_subsample_ratio,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{PackedFormat, SubsampleRatio};

    #[test]
    fn test_ycbcr_planes_in_order() {
        let frame = VideoFrame::ycbcr(
            4,
            2,
            SubsampleRatio::Ratio420,
            vec![1u8; 8],
            vec![2u8; 2],
            vec![3u8; 2],
        )
        .unwrap();
        let (bytes, meta) = serialize_video(&frame).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..8], &[1u8; 8]);
        assert_eq!(&bytes[8..10], &[2u8; 2]);
        assert_eq!(&bytes[10..], &[3u8; 2]);
        assert_eq!(meta.pix_format, "YCbCr");
        assert_eq!(meta.pix_subsample_ratio, "4:2:0");
        assert_eq!((meta.width, meta.height), (4, 2));
    }

    #[test]
    fn test_packed_shares_buffer() {
        let data = Bytes::from(vec![9u8; 2 * 2 * 8]);
        let frame = VideoFrame::packed(2, 2, PackedFormat::Rgba64, data.clone()).unwrap();
        let (bytes, meta) = serialize_video(&frame).unwrap();
        assert_eq!(bytes, data);
        assert_eq!(bytes.as_ptr(), data.as_ptr());
        assert_eq!(meta.pix_format, "RGBA64");
        assert!(meta.pix_subsample_ratio.is_empty());
    }

    #[test]
    fn test_paletted_unsupported() {
        let frame = VideoFrame::paletted(1, 1, vec![0u8], vec![[0, 0, 0, 255]]).unwrap();
        assert!(matches!(
            serialize_video(&frame),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
