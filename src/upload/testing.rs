//! In-memory transport for uploader tests

use crate::error::{Error, Result};
use crate::media::{AudioMetadata, Presentation, VideoMetadata};
use crate::telegram::{ChatTransport, MediaUpload, ProgressSender, SentMessage, StatusMessage};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

/// One recorded send call
#[derive(Debug, Clone)]
pub struct SentFile {
    pub presentation: Presentation,
    pub upload: MediaUpload,
    pub video: Option<VideoMetadata>,
    pub audio: Option<AudioMetadata>,
    /// Whether the thumbnail file existed while the send was running
    pub thumbnail_existed: bool,
}

pub struct MemoryTransport {
    next_id: AtomicI32,
    sent: Mutex<Vec<SentFile>>,
    edits: Mutex<Vec<(StatusMessage, String)>>,
    edit_attempts: AtomicUsize,
    edit_error: Mutex<Option<fn() -> Error>>,
    deleted: Mutex<Vec<StatusMessage>>,
    failing: Mutex<HashSet<PathBuf>>,
    hanging: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        MemoryTransport {
            next_id: AtomicI32::new(100),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            edit_attempts: AtomicUsize::new(0),
            edit_error: Mutex::new(None),
            deleted: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            hanging: AtomicBool::new(false),
        }
    }

    /// Make sends of `path` fail
    pub fn fail_on(&self, path: &Path) {
        self.failing.lock().insert(path.to_path_buf());
    }

    /// Make every media send wait forever
    pub fn hang_sends(&self) {
        self.hanging.store(true, Ordering::SeqCst);
    }

    async fn wait_if_hanging(&self) {
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    pub fn fail_edits_with(&self, make: fn() -> Error) {
        *self.edit_error.lock() = Some(make);
    }

    pub fn sent(&self) -> Vec<SentFile> {
        self.sent.lock().clone()
    }

    pub fn sent_paths(&self) -> Vec<PathBuf> {
        self.sent.lock().iter().map(|s| s.upload.path.clone()).collect()
    }

    pub fn edits(&self) -> Vec<(StatusMessage, String)> {
        self.edits.lock().clone()
    }

    pub fn edit_attempts(&self) -> usize {
        self.edit_attempts.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<StatusMessage> {
        self.deleted.lock().clone()
    }

    fn record(
        &self,
        status: &StatusMessage,
        presentation: Presentation,
        upload: MediaUpload,
        video: Option<VideoMetadata>,
        audio: Option<AudioMetadata>,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        let size = std::fs::metadata(&upload.path).map(|m| m.len()).unwrap_or(0);
        let _ = progress.send(size / 2);
        let _ = progress.send(size);

        if self.failing.lock().contains(&upload.path) {
            return Err(Error::TelegramClient("FILE_PARTS_INVALID".to_string()));
        }

        let thumbnail_existed = upload.thumbnail.as_ref().map(|t| t.exists()).unwrap_or(false);
        self.sent.lock().push(SentFile {
            presentation,
            upload,
            video,
            audio,
            thumbnail_existed,
        });

        Ok(SentMessage {
            chat_id: status.chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn send_status(&self, chat_id: i64, _text: &str, _topic: Option<i32>) -> Result<StatusMessage> {
        Ok(StatusMessage {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_status(&self, status: &StatusMessage, text: &str) -> Result<()> {
        self.edit_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = *self.edit_error.lock() {
            return Err(make());
        }
        self.edits.lock().push((*status, text.to_string()));
        Ok(())
    }

    async fn delete_status(&self, status: &StatusMessage) -> Result<()> {
        self.deleted.lock().push(*status);
        Ok(())
    }

    async fn send_document(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        self.wait_if_hanging().await;
        self.record(status, Presentation::Document, upload, None, None, progress)
    }

    async fn send_video(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        video: VideoMetadata,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        self.wait_if_hanging().await;
        self.record(status, Presentation::Video, upload, Some(video), None, progress)
    }

    async fn send_audio(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        audio: AudioMetadata,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        self.wait_if_hanging().await;
        self.record(status, Presentation::Audio, upload, None, Some(audio), progress)
    }
}
