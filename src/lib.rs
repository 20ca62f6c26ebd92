//! uploadgram - upload files and directory trees to Telegram
//!
//! Files are sent as documents, videos or audio depending on their
//! extension, with metadata probed from the file and a live progress
//! indicator kept in the chat.

pub mod config;
pub mod error;
pub mod media;
pub mod prompt;
pub mod signal;
pub mod telegram;
pub mod upload;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::telegram::{ChatTransport, TelegramBackend};
    pub use crate::upload::{run_upload, UploadOptions, UploadRequest};
}
