pub mod directory;
pub mod traits;

pub use directory::DirectorySource;
pub use traits::{FrameSource, SourceError};
