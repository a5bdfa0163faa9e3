//! facecam-hw: webcam capture.
//!
//! Provides V4L2-based camera access producing RGB frames, and the
//! [`FrameSource`] seam the live loop reads from.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::FrameError;
