//! moodcam-hw: frame sources for one-shot emotion capture.
//!
//! Provides V4L2 camera access with scoped device ownership, grayscale
//! frame conversion, and a still-image source for offline runs.

pub mod camera;
pub mod frame;
pub mod still;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::Frame;
pub use still::StillImage;
