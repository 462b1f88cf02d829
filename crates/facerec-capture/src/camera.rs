//! V4L2 webcam capture via the `v4l` crate.

use crate::frame::{self, Frame, JPEG_QUALITY};
use std::path::{Path, PathBuf};
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
const DARK_THRESHOLD: f32 = 0.95;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("frame error: {0}")]
    Frame(#[from] frame::FrameError),
    #[error("failed to read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image file is empty: {}", .0.display())]
    EmptyFile(PathBuf),
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Motion-JPEG: every buffer is already a JPEG image.
    Mjpg,
    /// YUYV 4:2:2 packed, converted to RGB and re-encoded.
    Yuyv,
}

impl PixelFormat {
    fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Mjpg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv => FourCC::new(b"YUYV"),
        }
    }

    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == FourCC::new(b"MJPG") {
            Some(PixelFormat::Mjpg)
        } else if fourcc == FourCC::new(b"YUYV") {
            Some(PixelFormat::Yuyv)
        } else {
            None
        }
    }
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CaptureError> {
        if !Path::new(device_path).exists() {
            return Err(CaptureError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CaptureError::DeviceBusy
            } else {
                CaptureError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CaptureError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(CaptureError::StreamingNotSupported);
        }

        // Prefer MJPG (no re-encoding); fall back to YUYV, which every UVC webcam offers.
        let mut negotiated = None;
        for wanted in [PixelFormat::Mjpg, PixelFormat::Yuyv] {
            let mut fmt = device.format().map_err(|e| {
                CaptureError::FormatNegotiationFailed(format!("failed to get format: {e}"))
            })?;
            fmt.fourcc = wanted.fourcc();
            fmt.width = REQUESTED_WIDTH;
            fmt.height = REQUESTED_HEIGHT;

            let got = device.set_format(&fmt).map_err(|e| {
                CaptureError::FormatNegotiationFailed(format!("failed to set format: {e}"))
            })?;
            if let Some(pixel_format) = PixelFormat::from_fourcc(got.fourcc) {
                negotiated = Some((got, pixel_format));
                break;
            }
            tracing::debug!(requested = ?wanted, got = ?got.fourcc, "format refused");
        }

        let (fmt, pixel_format) = negotiated.ok_or_else(|| {
            CaptureError::FormatNegotiationFailed("device offers neither MJPG nor YUYV".into())
        })?;

        tracing::info!(
            width = fmt.width,
            height = fmt.height,
            format = ?pixel_format,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: fmt.width,
            height: fmt.height,
            device_path: device_path.to_string(),
            pixel_format,
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Capture one usable frame.
    ///
    /// Discards `warmup` frames first so auto-exposure can settle, then reads
    /// up to `attempts` frames until one is not dark. If every attempt is
    /// dark, the last frame is returned with `is_dark` set.
    pub fn capture(&self, warmup: usize, attempts: usize) -> Result<Frame, CaptureError> {
        let mut stream =
            MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4).map_err(|e| {
                CaptureError::CaptureFailed(format!("failed to create mmap stream: {e}"))
            })?;

        for _ in 0..warmup {
            stream.next().map_err(|e| {
                CaptureError::CaptureFailed(format!("failed to dequeue warmup buffer: {e}"))
            })?;
        }
        if warmup > 0 {
            tracing::debug!(count = warmup, "discarded warmup frames");
        }

        let mut last = None;
        for _ in 0..attempts.max(1) {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CaptureError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
            let used = (meta.bytesused as usize).min(buf.len());

            let frame = self.to_frame(&buf[..used], meta.sequence)?;
            if !frame.is_dark {
                return Ok(frame);
            }
            tracing::debug!(seq = meta.sequence, "skipping dark frame");
            last = Some(frame);
        }

        tracing::warn!(device = %self.device_path, "every captured frame was dark");
        last.ok_or_else(|| CaptureError::CaptureFailed("no frame captured".into()))
    }

    fn to_frame(&self, buf: &[u8], sequence: u32) -> Result<Frame, CaptureError> {
        match self.pixel_format {
            PixelFormat::Mjpg => {
                let (width, height, luma) = frame::inspect_jpeg(buf)?;
                Ok(Frame {
                    jpeg: buf.to_vec(),
                    width,
                    height,
                    sequence,
                    is_dark: frame::is_dark_frame(&luma, DARK_THRESHOLD),
                })
            }
            PixelFormat::Yuyv => {
                let rgb = frame::yuyv_to_rgb(buf, self.width, self.height)?;
                let pixels = (self.width * self.height * 2) as usize;
                let luma = frame::yuyv_luma(&buf[..pixels]);
                Ok(Frame {
                    jpeg: frame::encode_jpeg(&rgb, self.width, self.height, JPEG_QUALITY)?,
                    width: self.width,
                    height: self.height,
                    sequence,
                    is_dark: frame::is_dark_frame(&luma, DARK_THRESHOLD),
                })
            }
        }
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}
