use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{ImageFormat, RgbImage};
use log::{debug, warn};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};

use crate::config::FrameSize;
use crate::error::MonitorError;
use crate::{Result, RoomLabel};

pub trait FrameSource {
    fn capture(&mut self) -> Result<RgbImage>;
}

pub struct Camera {
    index: u32,
    inner: nokhwa::Camera,
}

impl Camera {
    pub fn open(index: u32) -> std::result::Result<Self, MonitorError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut inner = nokhwa::Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| MonitorError::Camera(format!("failed to open camera {}: {}", index, e)))?;
        inner
            .open_stream()
            .map_err(|e| MonitorError::Camera(format!("failed to start camera {}: {}", index, e)))?;
        Ok(Self { index, inner })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Probes indices `0..count` and opens the first camera whose frames are `expected` sized.
    pub fn open_expected(count: u32, expected: FrameSize) -> std::result::Result<Self, MonitorError> {
        let index = probe_cameras(count, expected, |i| {
            let mut camera = Camera::open(i)?;
            let frame = camera
                .capture()
                .map_err(|e| MonitorError::Camera(format!("{:#}", e)))?;
            Ok((frame.width(), frame.height()))
        })?;
        Camera::open(index)
    }
}

impl FrameSource for Camera {
    fn capture(&mut self) -> Result<RgbImage> {
        let buffer = self
            .inner
            .frame()
            .with_context(|| format!("failed to read a frame from camera {}", self.index))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .context("failed to decode camera frame")?;
        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| anyhow::anyhow!("camera frame buffer does not match {}x{}", width, height))
    }
}

/// Returns the first index in `0..count` whose probed frame size equals `expected`.
/// Devices that fail to open are skipped.
pub fn probe_cameras<F>(
    count: u32,
    expected: FrameSize,
    mut frame_size: F,
) -> std::result::Result<u32, MonitorError>
where
    F: FnMut(u32) -> std::result::Result<(u32, u32), MonitorError>,
{
    for index in 0..count {
        match frame_size(index) {
            Ok((width, height)) => {
                debug!("camera {}: {}x{}", index, width, height);
                if width == expected.width && height == expected.height {
                    return Ok(index);
                }
            }
            Err(e) => warn!("camera {}: {}", index, e),
        }
    }
    Err(MonitorError::CameraNotFound {
        probed: count,
        width: expected.width,
        height: expected.height,
    })
}

pub fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .context("failed to encode frame as JPEG")?;
    Ok(jpeg)
}

/// Writes already-encoded JPEG bytes, creating parent folders as needed.
pub fn write_snapshot(path: &Path, jpeg: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, jpeg).with_context(|| format!("failed to write {}", path.display()))
}

/// Keeps every captured frame under `<root>/<run>/<label>/`.
pub struct FrameArchive {
    run_dir: PathBuf,
}

impl FrameArchive {
    pub fn create(root: &Path, run_name: &str) -> Result<Self> {
        let run_dir = root.join(run_name);
        for label in RoomLabel::ALL {
            let dir = run_dir.join(label.as_str());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn save(&self, jpeg: &[u8], label: RoomLabel, stamp: &str) -> Result<PathBuf> {
        let path = self
            .run_dir
            .join(label.as_str())
            .join(format!("{}_{}.jpg", stamp, label));
        std::fs::write(&path, jpeg).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
