use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest frame a detector will accept. The background model keeps one
/// `f64` per sample, so this caps it at 128 MiB.
pub const MAX_SAMPLES: usize = 1 << 24;

/// Fixed dimensions of every frame a detector sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl FrameGeometry {
    pub const fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Number of samples in a frame of this geometry (width x height x channels),
    /// or `None` if the product does not fit in `usize`.
    pub fn checked_sample_count(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.channels as usize)
    }

    /// Sample count, saturating at `usize::MAX`. Use [`Self::validate`] before
    /// allocating anything of this size.
    pub fn sample_count(&self) -> usize {
        self.checked_sample_count().unwrap_or(usize::MAX)
    }

    /// Check that a frame of this geometry is non-empty and no larger than
    /// [`MAX_SAMPLES`], returning its sample count.
    pub fn validate(&self) -> Result<usize, FrameError> {
        match self.checked_sample_count() {
            Some(0) => Err(FrameError::EmptyGeometry(*self)),
            Some(count) if count <= MAX_SAMPLES => Ok(count),
            _ => Err(FrameError::TooLarge(*self)),
        }
    }
}

impl Default for FrameGeometry {
    /// 96x96 grayscale, the resolution the person-detection model expects.
    fn default() -> Self {
        Self::new(96, 96, 1)
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// One captured image, flattened row-major into signed 8-bit samples.
///
/// The sample count always equals `geometry.sample_count()`; every
/// constructor checks it, so downstream code can rely on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    geometry: FrameGeometry,
    samples: Vec<i8>,
}

impl Frame {
    pub fn new(geometry: FrameGeometry, samples: Vec<i8>) -> Result<Self, FrameError> {
        check_len(geometry, samples.len())?;
        Ok(Self { geometry, samples })
    }

    /// Convert unsigned camera bytes to signed samples.
    ///
    /// Flipping the top bit maps 0..=255 onto -128..=127 while keeping order,
    /// which is the input encoding the int8 model is trained on.
    pub fn from_camera_bytes(geometry: FrameGeometry, bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(geometry, bytes.len())?;
        let samples = bytes.iter().map(|&b| (b ^ 0x80) as i8).collect();
        Ok(Self { geometry, samples })
    }

    /// A frame where every sample has the same value.
    pub fn filled(geometry: FrameGeometry, value: i8) -> Result<Self, FrameError> {
        check_len(geometry, geometry.sample_count())?;
        Ok(Self {
            geometry,
            samples: vec![value; geometry.sample_count()],
        })
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn samples(&self) -> &[i8] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn check_len(geometry: FrameGeometry, got: usize) -> Result<(), FrameError> {
    let expected = geometry.validate()?;
    if got != expected {
        return Err(FrameError::LengthMismatch {
            geometry,
            expected,
            got,
        });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame geometry {0} has no samples")]
    EmptyGeometry(FrameGeometry),
    #[error("frame geometry {0} exceeds {max} samples", max = MAX_SAMPLES)]
    TooLarge(FrameGeometry),
    #[error("frame for {geometry} needs {expected} samples, got {got}")]
    LengthMismatch {
        geometry: FrameGeometry,
        expected: usize,
        got: usize,
    },
}
