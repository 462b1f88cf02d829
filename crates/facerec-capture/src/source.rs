//! Where recognition images come from.

use crate::camera::{Camera, CaptureError};
use std::path::{Path, PathBuf};

/// Frames discarded after opening the camera so exposure can settle.
pub const DEFAULT_WARMUP_FRAMES: usize = 10;
/// Captures tried before giving up on getting a non-dark frame.
pub const DEFAULT_CAPTURE_ATTEMPTS: usize = 3;

/// An encoded image ready to hand to the recognition client.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    /// Name used for multipart uploads.
    pub filename: String,
    pub mime: &'static str,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Supplies one encoded image per call.
pub trait ImageSource {
    fn acquire(&mut self) -> Result<CapturedImage, CaptureError>;
}

/// Reads an image file from disk as-is, without re-encoding.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileSource {
    fn acquire(&mut self) -> Result<CapturedImage, CaptureError> {
        let bytes = std::fs::read(&self.path).map_err(|source| CaptureError::File {
            path: self.path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(CaptureError::EmptyFile(self.path.clone()));
        }

        let filename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());
        let mime = image::ImageFormat::from_path(&self.path)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");

        tracing::debug!(path = %self.path.display(), size = bytes.len(), "loaded image file");

        Ok(CapturedImage {
            bytes,
            filename,
            mime,
            width: None,
            height: None,
        })
    }
}

/// Captures a JPEG from a V4L2 webcam.
pub struct CameraSource {
    camera: Camera,
    warmup_frames: usize,
    attempts: usize,
    save_path: Option<PathBuf>,
}

impl CameraSource {
    pub fn open(device_path: &str) -> Result<Self, CaptureError> {
        Ok(Self {
            camera: Camera::open(device_path)?,
            warmup_frames: DEFAULT_WARMUP_FRAMES,
            attempts: DEFAULT_CAPTURE_ATTEMPTS,
            save_path: None,
        })
    }

    pub fn with_warmup_frames(mut self, frames: usize) -> Self {
        self.warmup_frames = frames;
        self
    }

    /// Also write every captured JPEG to `path` for inspection.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}

impl ImageSource for CameraSource {
    fn acquire(&mut self) -> Result<CapturedImage, CaptureError> {
        let frame = self.camera.capture(self.warmup_frames, self.attempts)?;

        tracing::info!(
            device = %self.camera.device_path,
            width = frame.width,
            height = frame.height,
            seq = frame.sequence,
            dark = frame.is_dark,
            "frame captured"
        );

        if let Some(path) = &self.save_path {
            match std::fs::write(path, &frame.jpeg) {
                Ok(()) => tracing::info!(path = %path.display(), "capture saved"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save capture"),
            }
        }

        Ok(CapturedImage {
            bytes: frame.jpeg,
            filename: format!("capture_{}.jpg", frame.sequence),
            mime: "image/jpeg",
            width: Some(frame.width),
            height: Some(frame.height),
        })
    }
}
