//! Frame type and pixel conversion: YUYV, Y16, MJPEG to 8-bit luma.

use image::{GrayImage, ImageFormat};

/// Fraction of near-black pixels above which a frame counts as dark.
pub const DARK_FRAME_THRESHOLD: f32 = 0.95;

/// A single captured grayscale frame.
///
/// Owned by whoever captured it; the engine hands it to the detector and
/// drops it right after classification.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data, row-major (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
    pub is_dark: bool,
}

impl Frame {
    /// Build a frame from raw luma bytes, checking the buffer size.
    pub fn from_gray(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        let is_dark = is_dark_frame(&data, DARK_FRAME_THRESHOLD);
        Ok(Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
            is_dark,
        })
    }

    /// Wrap an already-decoded luma image.
    pub fn from_luma(image: GrayImage, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        let data = image.into_raw();
        let is_dark = is_dark_frame(&data, DARK_FRAME_THRESHOLD);
        Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
            is_dark,
        }
    }

    /// Average pixel brightness (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

/// Convert packed YUYV (4:2:2) to grayscale by keeping the Y samples.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = width as usize * height as usize * 2;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// Downscale 16-bit little-endian luma to 8 bits by keeping the high byte.
pub fn y16_to_grayscale(y16: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = width as usize * height as usize * 2;
    if y16.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: y16.len(),
        });
    }
    Ok(y16[..expected].chunks_exact(2).map(|px| px[1]).collect())
}

/// Decode one motion-JPEG buffer to luma.
///
/// Returns the pixels with the dimensions found in the JPEG header, which
/// callers should prefer over the negotiated format size.
pub fn mjpeg_to_grayscale(jpeg: &[u8]) -> Result<(Vec<u8>, u32, u32), FrameError> {
    let decoded = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map_err(|e| FrameError::Decode(e.to_string()))?;
    let luma = decoded.to_luma8();
    let (width, height) = luma.dimensions();
    Ok((luma.into_raw(), width, height))
}

/// Returns true if more than `threshold_pct` of pixels are below 32.
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < 32).count();
    (dark_count as f32 / gray.len() as f32) > threshold_pct
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("MJPEG decode failed: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};
    use std::io::Cursor;

    #[test]
    fn test_yuyv_keeps_luma_samples() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let gray = yuyv_to_grayscale(&[100, 128, 200, 128], 2, 1).unwrap();
        assert_eq!(gray, vec![100, 200]);
    }

    #[test]
    fn test_yuyv_ignores_trailing_bytes() {
        let mut yuyv: Vec<u8> = (0..8).collect();
        yuyv.extend([255, 255]);
        let gray = yuyv_to_grayscale(&yuyv, 2, 2).unwrap();
        assert_eq!(gray, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_yuyv_short_buffer() {
        let err = yuyv_to_grayscale(&[100, 128], 2, 1).unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { expected: 4, actual: 2 }));
    }

    #[test]
    fn test_y16_keeps_high_byte() {
        // 0x12AB and 0xFF00 little-endian
        let gray = y16_to_grayscale(&[0xAB, 0x12, 0x00, 0xFF], 2, 1).unwrap();
        assert_eq!(gray, vec![0x12, 0xFF]);
    }

    #[test]
    fn test_mjpeg_decodes_dimensions() {
        let img = GrayImage::from_pixel(16, 8, Luma([180u8]));
        let mut jpeg = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let (gray, w, h) = mjpeg_to_grayscale(&jpeg).unwrap();
        assert_eq!((w, h), (16, 8));
        assert_eq!(gray.len(), 16 * 8);
        // Lossy, but a flat image stays close to its value.
        assert!(gray.iter().all(|&p| (p as i32 - 180).abs() <= 3));
    }

    #[test]
    fn test_mjpeg_garbage_is_error() {
        assert!(matches!(
            mjpeg_to_grayscale(&[0, 1, 2, 3]),
            Err(FrameError::Decode(_))
        ));
    }

    #[test]
    fn test_from_gray_checks_size() {
        assert!(Frame::from_gray(vec![0; 5], 2, 2, 0).is_err());
        let frame = Frame::from_gray(vec![200; 4], 2, 2, 7).unwrap();
        assert_eq!(frame.sequence, 7);
        assert!(!frame.is_dark);
        assert_eq!(frame.avg_brightness(), 200.0);
    }

    #[test]
    fn test_from_luma_flags_dark() {
        let frame = Frame::from_luma(GrayImage::new(4, 4), 0);
        assert_eq!((frame.width, frame.height), (4, 4));
        assert!(frame.is_dark);
    }

    #[test]
    fn test_dark_frame_borderline() {
        // 96% dark is dark, 94% is not
        let mut mostly = vec![10u8; 960];
        mostly.extend(vec![128u8; 40]);
        assert!(is_dark_frame(&mostly, DARK_FRAME_THRESHOLD));

        let mut some = vec![10u8; 940];
        some.extend(vec![128u8; 60]);
        assert!(!is_dark_frame(&some, DARK_FRAME_THRESHOLD));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], DARK_FRAME_THRESHOLD));
    }
}
