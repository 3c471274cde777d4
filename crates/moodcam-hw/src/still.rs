//! Still-image frame source.
//!
//! Stands in for a camera when classifying a photo from disk.

use crate::camera::{CameraError, FrameSource};
use crate::frame::Frame;
use std::path::{Path, PathBuf};

/// A [`FrameSource`] that yields the luma plane of an image file.
pub struct StillImage {
    path: PathBuf,
}

impl StillImage {
    /// Check that the file exists. Decoding happens on read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CameraError::DeviceNotFound(path.display().to_string()));
        }
        tracing::info!(path = %path.display(), "opened still image");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for StillImage {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let decoded = image::open(&self.path).map_err(|e| {
            CameraError::CaptureFailed(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Frame::from_luma(decoded.to_luma8(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("moodcam-still-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_missing_file() {
        let err = StillImage::open(temp_path("missing.png")).err().unwrap();
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
    }

    #[test]
    fn test_reads_png_as_luma() {
        let path = temp_path("face.png");
        GrayImage::from_pixel(6, 4, Luma([90u8])).save(&path).unwrap();

        let mut source = StillImage::open(&path).unwrap();
        let frame = source.read_frame().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!((frame.width, frame.height), (6, 4));
        assert!(frame.data.iter().all(|&p| p == 90));
    }

    #[test]
    fn test_undecodable_file_is_capture_failure() {
        let path = temp_path("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut source = StillImage::open(&path).unwrap();
        let result = source.read_frame();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(CameraError::CaptureFailed(_))));
    }
}
