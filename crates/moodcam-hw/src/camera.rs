//! V4L2 camera capture via the `v4l` crate.
//!
//! A [`Camera`] owns its device for as long as it lives; dropping it closes
//! the device. Callers that want the device held only for one read should
//! scope the camera tightly around [`FrameSource::read_frame`].

use crate::frame::{self, Frame};
use std::io;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// `EBUSY` on Linux.
const EBUSY: i32 = 16;

/// Number of mmap buffers queued for a single read.
const STREAM_BUFFERS: u32 = 2;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy: {0}")]
    DeviceBusy(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("video capture not supported by {0}")]
    StreamingNotSupported(String),
}

/// Anything that can hand out one grayscale frame.
pub trait FrameSource {
    /// Read exactly one frame. An error means no usable frame was produced.
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Pixel formats the capture path can turn into luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed, Y channel extracted.
    Yuyv,
    /// 8-bit grayscale.
    Grey,
    /// 16-bit little-endian grayscale.
    Y16,
    /// Motion-JPEG, decoded per frame.
    Mjpeg,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"GREY" => Some(Self::Grey),
            b"Y16 " | b"Y16\0" => Some(Self::Y16),
            b"MJPG" => Some(Self::Mjpeg),
            _ => None,
        }
    }
}

/// Default device path for a camera index (`0` → `/dev/video0`).
pub fn device_path_for_index(index: usize) -> String {
    format!("/dev/video{index}")
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    ///
    /// The device's current resolution is kept. The current pixel format is
    /// kept if it is one we can convert, otherwise YUYV is requested.
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| open_error(device_path, e))?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported(device_path.to_string()));
        }

        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        if PixelFormat::from_fourcc(fmt.fourcc).is_none() {
            tracing::debug!(current = ?fmt.fourcc, "requesting YUYV");
            fmt.fourcc = FourCC::new(b"YUYV");
            fmt = device.set_format(&fmt).map_err(|e| {
                CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
            })?;
        }

        let pixel_format = PixelFormat::from_fourcc(fmt.fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {:?} (need YUYV, GREY, Y16, or MJPG)",
                fmt.fourcc
            ))
        })?;

        tracing::info!(
            width = fmt.width,
            height = fmt.height,
            fourcc = ?fmt.fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: fmt.width,
            height: fmt.height,
            device_path: device_path.to_string(),
            fourcc: fmt.fourcc,
            pixel_format,
        })
    }

    /// Convert one raw buffer to luma based on the negotiated format.
    fn to_grayscale(&self, buf: &[u8]) -> Result<(Vec<u8>, u32, u32), CameraError> {
        let (w, h) = (self.width, self.height);
        let converted = match self.pixel_format {
            PixelFormat::Grey => {
                let pixels = w as usize * h as usize;
                if buf.len() < pixels {
                    return Err(CameraError::CaptureFailed(format!(
                        "GREY buffer too short: expected {pixels}, got {}",
                        buf.len()
                    )));
                }
                Ok((buf[..pixels].to_vec(), w, h))
            }
            PixelFormat::Yuyv => frame::yuyv_to_grayscale(buf, w, h).map(|g| (g, w, h)),
            PixelFormat::Y16 => frame::y16_to_grayscale(buf, w, h).map(|g| (g, w, h)),
            PixelFormat::Mjpeg => frame::mjpeg_to_grayscale(buf),
        };
        converted.map_err(|e| CameraError::CaptureFailed(format!("{:?}: {e}", self.pixel_format)))
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        (0..16)
            .map(device_path_for_index)
            .filter(|path| Path::new(path).exists())
            .filter_map(|path| {
                let dev = Device::with_path(&path).ok()?;
                let caps = dev.query_caps().ok()?;
                caps.capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                    .then(|| DeviceInfo {
                        path,
                        name: caps.card.clone(),
                        driver: caps.driver.clone(),
                        bus: caps.bus.clone(),
                    })
            })
            .collect()
    }
}

impl FrameSource for Camera {
    /// Dequeue a single buffer and convert it to grayscale.
    ///
    /// The mmap stream lives only for this call.
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let (gray, width, height) = self.to_grayscale(buf)?;
        let frame = Frame::from_gray(gray, width, height, meta.sequence)
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        tracing::debug!(
            seq = frame.sequence,
            width = frame.width,
            height = frame.height,
            brightness = frame.avg_brightness(),
            "captured frame"
        );
        Ok(frame)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        tracing::info!(device = %self.device_path, "released camera");
    }
}

fn open_error(device_path: &str, e: io::Error) -> CameraError {
    let detail = format!("{device_path}: {e}");
    if e.kind() == io::ErrorKind::PermissionDenied {
        CameraError::PermissionDenied(detail)
    } else if e.raw_os_error() == Some(EBUSY) {
        CameraError::DeviceBusy(detail)
    } else {
        CameraError::DeviceNotFound(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path_for_index() {
        assert_eq!(device_path_for_index(0), "/dev/video0");
        assert_eq!(device_path_for_index(3), "/dev/video3");
    }

    #[test]
    fn test_pixel_format_from_fourcc() {
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"YUYV")), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"MJPG")), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"Y16 ")), Some(PixelFormat::Y16));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"NV12")), None);
    }

    #[test]
    fn test_open_missing_device() {
        let err = Camera::open("/dev/moodcam-does-not-exist").err().unwrap();
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
    }

    #[test]
    fn test_open_error_classification() {
        let denied = open_error("/dev/video0", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, CameraError::PermissionDenied(_)));

        let busy = open_error("/dev/video0", io::Error::from_raw_os_error(EBUSY));
        assert!(matches!(busy, CameraError::DeviceBusy(_)));
    }
}
