//! Media handling
//!
//! Everything needed to decide how a file is presented in the chat:
//! - Extension based classification
//! - Metadata probing through ffprobe
//! - Thumbnail extraction through ffmpeg

mod classify;
mod probe;
mod thumbnail;

pub use classify::{classify, file_extension, Presentation};
pub use probe::{AudioMetadata, MediaProbe, MediaProber, VideoMetadata};
pub use thumbnail::ThumbnailExtractor;
