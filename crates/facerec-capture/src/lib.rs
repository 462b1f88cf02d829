//! facerec-capture — Image sources for the recognition client.
//!
//! Provides V4L2 webcam capture (MJPG passthrough or YUYV converted to
//! JPEG) and plain file loading behind one [`ImageSource`] trait.

pub mod camera;
pub mod frame;
pub mod source;

pub use camera::{Camera, CaptureError, DeviceInfo, PixelFormat};
pub use frame::Frame;
pub use source::{CameraSource, CapturedImage, FileSource, ImageSource};
