use crowdedness_common::frame::{Frame, FrameError};
use std::path::PathBuf;

/// Supplier of fixed-geometry frames, one per cycle.
///
/// `Ok(None)` means the source is exhausted. An `Err` covers a single
/// failed capture; callers may skip it and ask again.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to decode {0}: {1}")]
    Decode(PathBuf, image::ImageError),
    #[error("unsupported channel count {0}, expected 1 or 3")]
    Channels(u32),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
