use crate::config::Config;
use anyhow::{Context, Result};
use facerec_capture::{CameraSource, CapturedImage, FileSource, ImageSource};
use std::path::PathBuf;

/// Load `image` from disk, or grab a frame from the configured camera when `None`.
pub async fn acquire(image: Option<PathBuf>, config: &Config) -> Result<CapturedImage> {
    match image {
        Some(path) => {
            let mut source = FileSource::new(path);
            let image = source
                .acquire()
                .with_context(|| format!("failed to load {}", source.path().display()))?;
            Ok(image)
        }
        None => capture_from_camera(config).await,
    }
}

/// Open the camera, capture one frame, close the camera.
///
/// V4L2 calls block, so the capture runs on the blocking pool.
pub async fn capture_from_camera(config: &Config) -> Result<CapturedImage> {
    let device = config.camera_device.clone();
    let warmup = config.warmup_frames;
    let save_path = config.capture_save_path.clone();

    println!("Opening camera {device}...");
    let image = tokio::task::spawn_blocking(move || {
        let mut source = CameraSource::open(&device)?.with_warmup_frames(warmup);
        if let Some(path) = save_path {
            source = source.with_save_path(path);
        }
        source.acquire()
    })
    .await
    .context("camera task panicked")?
    .with_context(|| format!("camera capture failed on {}", config.camera_device))?;

    println!("Photo captured ({} bytes)", image.bytes.len());
    Ok(image)
}
