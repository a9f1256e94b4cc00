use crowdedness_common::frame::{Frame, FrameGeometry};
use image::imageops::FilterType;
use image::ImageReader;
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::traits::{FrameSource, SourceError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "pgm", "pnm"];

/// Replays still images from a directory as camera frames.
///
/// Files are visited in file-name order. Each one is decoded, resized to
/// the configured geometry, reduced to luma (1 channel) or RGB (3 channels)
/// and converted to signed samples the way camera bytes are.
pub struct DirectorySource {
    geometry: FrameGeometry,
    pending: VecDeque<PathBuf>,
}

impl DirectorySource {
    pub fn open(dir: &Path, geometry: FrameGeometry) -> Result<Self, SourceError> {
        if !matches!(geometry.channels, 1 | 3) {
            return Err(SourceError::Channels(geometry.channels));
        }

        let entries =
            std::fs::read_dir(dir).map_err(|e| SourceError::Read(dir.to_path_buf(), e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SourceError::Read(dir.to_path_buf(), e))?
                .path();
            if path.is_file() && has_image_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        info!(
            dir = %dir.display(),
            frames = paths.len(),
            %geometry,
            "directory frame source opened"
        );
        Ok(Self {
            geometry,
            pending: paths.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn decode(&self, path: &Path) -> Result<Frame, SourceError> {
        let data = std::fs::read(path).map_err(|e| SourceError::Read(path.to_path_buf(), e))?;
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| SourceError::Read(path.to_path_buf(), e))?
            .decode()
            .map_err(|e| SourceError::Decode(path.to_path_buf(), e))?
            .resize_exact(
                self.geometry.width,
                self.geometry.height,
                FilterType::Nearest,
            );

        let bytes = if self.geometry.channels == 1 {
            img.to_luma8().into_raw()
        } else {
            img.to_rgb8().into_raw()
        };
        Ok(Frame::from_camera_bytes(self.geometry, &bytes)?)
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let frame = self.decode(&path)?;
        debug!(path = %path.display(), remaining = self.pending.len(), "frame decoded");
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "directory"
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
