//! Telegram backend module
//!
//! Handles all communication with Telegram's API including:
//! - Authentication and session management
//! - Resolving the target chat
//! - Sending files as documents, videos or audio
//! - Editing the status message used as a progress indicator

mod client;
mod progress_reader;

pub use client::{parse_chat_target, ChatTarget, TelegramBackend};
pub use progress_reader::ProgressReader;

use crate::error::Result;
use crate::media::{AudioMetadata, VideoMetadata};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Largest file a premium account may upload
pub const PREMIUM_MAX_FILE_SIZE: u64 = 4_194_304_000;

/// Largest file a regular account may upload
pub const MAX_FILE_SIZE: u64 = 2_097_152_000;

/// Carries the absolute number of bytes sent so far
pub type ProgressSender = mpsc::UnboundedSender<u64>;

/// A message used as a live progress indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// A message produced by a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// A file about to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub path: PathBuf,
    /// HTML caption
    pub caption: String,
    pub thumbnail: Option<PathBuf>,
}

/// The logged-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub first_name: String,
    pub premium: bool,
}

impl AccountInfo {
    /// Per-file size limit for this account tier
    pub fn max_upload_size(&self) -> u64 {
        if self.premium {
            PREMIUM_MAX_FILE_SIZE
        } else {
            MAX_FILE_SIZE
        }
    }
}

/// Operations the uploader needs from a chat service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a new status message, optionally inside a forum topic
    async fn send_status(&self, chat_id: i64, text: &str, topic: Option<i32>) -> Result<StatusMessage>;

    /// Replace the text of a status message
    async fn edit_status(&self, status: &StatusMessage, text: &str) -> Result<()>;

    async fn delete_status(&self, status: &StatusMessage) -> Result<()>;

    async fn send_document(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        progress: ProgressSender,
    ) -> Result<SentMessage>;

    async fn send_video(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        video: VideoMetadata,
        progress: ProgressSender,
    ) -> Result<SentMessage>;

    async fn send_audio(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        audio: AudioMetadata,
        progress: ProgressSender,
    ) -> Result<SentMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_limits() {
        let mut account = AccountInfo {
            first_name: "Ada".into(),
            premium: false,
        };
        assert_eq!(account.max_upload_size(), MAX_FILE_SIZE);

        account.premium = true;
        assert_eq!(account.max_upload_size(), PREMIUM_MAX_FILE_SIZE);
    }
}
