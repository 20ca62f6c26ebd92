//! Upload orchestration
//!
//! A run posts a status message into the target chat, sends every file as
//! a reply to it while the message shows progress, then removes it.

mod batch;
mod progress;
mod single;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{collect_files, BatchReport, BatchUploader};
pub use progress::{
    console_bar, format_duration, format_percentage, human_bytes, render_progress, ProgressContext, ProgressRenderer,
    ProgressStats,
};
pub use single::{default_caption, escape_html, FileUploader, UploadOptions, UploadOutcome};

use crate::config::UploadConfig;
use crate::error::Result;
use crate::telegram::{AccountInfo, ChatTransport};
use std::path::PathBuf;
use tracing::{debug, info};

/// Text of the status message before the first progress edit
pub const INITIAL_STATUS: &str = "<code>Initializing upload...</code>";

/// Everything needed for one run
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub chat_id: i64,
    pub path: PathBuf,
    /// Forum topic to post into
    pub topic: Option<i32>,
    pub options: UploadOptions,
}

/// Upload `request.path` into the chat
///
/// The status message doubles as a write-permission check: if it cannot be
/// posted nothing else is attempted.
pub async fn run_upload<T: ChatTransport + ?Sized>(
    transport: &T,
    account: &AccountInfo,
    config: &UploadConfig,
    request: &UploadRequest,
) -> Result<Option<BatchReport>> {
    let status = transport
        .send_status(request.chat_id, INITIAL_STATUS, request.topic)
        .await?;

    let max_size = account.max_upload_size();
    debug!("Per-file limit is {}", human_bytes(max_size));

    let renderer = ProgressRenderer::new(config.progress_interval());
    let report = BatchUploader::new(transport, &renderer, config)
        .upload_path(&request.path, max_size, &status, &request.options)
        .await;

    if let Err(e) = transport.delete_status(&status).await {
        debug!("Failed to delete status message: {}", e);
    }

    let report = report?;
    if let Some(report) = &report {
        info!(
            "Done: {} uploaded, {} failed, {} too large, {} missing",
            report.uploaded.len(),
            report.failed.len(),
            report.oversized.len(),
            report.missing.len()
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::testing::MemoryTransport;

    #[tokio::test]
    async fn test_run_deletes_status_message() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let config = UploadConfig {
            pacing_delay_ms: 0,
            ffmpeg_path: PathBuf::from("uploadgram-test-no-such-ffmpeg"),
            ffprobe_path: PathBuf::from("uploadgram-test-no-such-ffprobe"),
            ..UploadConfig::default()
        };
        let account = AccountInfo {
            first_name: "Ada".to_string(),
            premium: false,
        };
        let request = UploadRequest {
            chat_id: 5,
            path: dir.path().to_path_buf(),
            topic: None,
            options: UploadOptions::default(),
        };

        let transport = MemoryTransport::new();
        let report = run_upload(&transport, &account, &config, &request)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.uploaded.len(), 1);
        let deleted = transport.deleted();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].chat_id, 5);
    }

    #[tokio::test]
    async fn test_run_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let account = AccountInfo {
            first_name: "Ada".to_string(),
            premium: true,
        };
        let request = UploadRequest {
            chat_id: 5,
            path: dir.path().join("missing"),
            topic: Some(3),
            options: UploadOptions::default(),
        };

        let transport = MemoryTransport::new();
        let report = run_upload(&transport, &account, &UploadConfig::default(), &request)
            .await
            .unwrap();

        assert!(report.is_none());
        assert_eq!(transport.deleted().len(), 1);
    }
}
