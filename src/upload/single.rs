//! Sending one file
//!
//! Picks the presentation, gathers metadata for videos and audio, and wires
//! the transfer's byte count into the progress renderer.

use crate::config::UploadConfig;
use crate::error::Result;
use crate::media::{
    classify, MediaProbe, MediaProber, Presentation, ThumbnailExtractor, VideoMetadata,
};
use crate::telegram::{ChatTransport, MediaUpload, ProgressSender, SentMessage, StatusMessage};
use crate::upload::progress::{console_bar, ProgressContext, ProgressRenderer};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

/// Options shared by every file of a run
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Remove local files once sent
    pub delete_on_success: bool,
    /// Send everything as a plain document
    pub force_document: bool,
    /// Thumbnail used for every video instead of a generated one
    pub thumbnail: Option<PathBuf>,
    /// Caption used instead of the file name
    pub caption: Option<String>,
    /// Draw a progress bar in the terminal
    pub console_progress: bool,
}

/// Result of a single upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Sent(SentMessage),
    /// The file was gone before anything was sent
    Missing,
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Caption for a file, unless the user provided one
pub fn default_caption(file_name: &str) -> String {
    format!("<code>{}</code>", escape_html(file_name))
}

/// Uploads single files through a transport
pub struct FileUploader<'a, T: ?Sized> {
    transport: &'a T,
    renderer: &'a ProgressRenderer,
    config: &'a UploadConfig,
    prober: MediaProber,
    thumbnails: ThumbnailExtractor,
}

impl<'a, T: ChatTransport + ?Sized> FileUploader<'a, T> {
    pub fn new(transport: &'a T, renderer: &'a ProgressRenderer, config: &'a UploadConfig) -> Self {
        FileUploader {
            transport,
            renderer,
            config,
            prober: MediaProber::new(config.ffprobe_path.clone()),
            thumbnails: ThumbnailExtractor::new(config),
        }
    }

    /// Send `path` as a reply to `status`
    pub async fn upload(
        &self,
        path: &Path,
        status: &StatusMessage,
        options: &UploadOptions,
    ) -> Result<UploadOutcome> {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                debug!("{:?} disappeared before upload", path);
                return Ok(UploadOutcome::Missing);
            }
        };

        let started = Instant::now();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let presentation = classify(&file_name, options.force_document, self.config);
        debug!("Sending {:?} as {}", path, presentation);

        let ctx = ProgressContext {
            status: *status,
            total: size,
            started,
            label: format!(
                "Uploading <b>{}</b> as {}",
                escape_html(&file_name),
                presentation
            ),
            bar: options
                .console_progress
                .then(|| console_bar(size, &file_name)),
        };

        let upload = MediaUpload {
            path: path.to_path_buf(),
            caption: options
                .caption
                .clone()
                .unwrap_or_else(|| default_caption(&file_name)),
            thumbnail: options.thumbnail.clone(),
        };

        let sent = match presentation {
            Presentation::Document => {
                self.tracked(&ctx, |tx| self.transport.send_document(status, upload, tx))
                    .await
            }
            Presentation::Video => self.upload_video(status, upload, &ctx).await,
            Presentation::Audio => self.upload_audio(status, upload, &ctx).await,
        };

        if let (Err(_), Some(bar)) = (&sent, &ctx.bar) {
            bar.abandon_with_message("failed");
        }

        sent.map(UploadOutcome::Sent)
    }

    async fn upload_video(
        &self,
        status: &StatusMessage,
        mut upload: MediaUpload,
        ctx: &ProgressContext,
    ) -> Result<SentMessage> {
        let duration = self
            .probe(&upload.path)
            .await
            .map(|p| p.duration_secs())
            .unwrap_or(0);

        // Dropping the frame deletes it, including when this future is cancelled
        let mut generated = None;
        if upload.thumbnail.is_none() {
            let dir = upload.path.parent().unwrap_or_else(|| Path::new("."));
            generated = self
                .thumbnails
                .extract(&upload.path, dir, duration as f64 / 2.0)
                .await;
        }

        let mut video = VideoMetadata {
            duration,
            ..VideoMetadata::default()
        };

        if let Some(thumb) = &generated {
            if let Some(probe) = self.probe(thumb).await {
                video.width = probe.width.unwrap_or(0);
                video.height = probe.height.unwrap_or(0);
            }
            upload.thumbnail = Some(thumb.to_path_buf());
        }

        let sent = self
            .tracked(ctx, |tx| self.transport.send_video(status, upload, video, tx))
            .await;

        if let Some(thumb) = generated {
            let path = thumb.to_path_buf();
            if let Err(e) = thumb.close() {
                debug!("Failed to remove thumbnail {:?}: {}", path, e);
            }
        }

        sent
    }

    async fn upload_audio(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        ctx: &ProgressContext,
    ) -> Result<SentMessage> {
        let audio = self
            .probe(&upload.path)
            .await
            .map(|p| p.audio_metadata())
            .unwrap_or_default();

        self.tracked(ctx, |tx| self.transport.send_audio(status, upload, audio, tx))
            .await
    }

    /// Probe failures only cost us metadata
    async fn probe(&self, path: &Path) -> Option<MediaProbe> {
        match self.prober.probe(path).await {
            Ok(probe) => Some(probe),
            Err(e) => {
                debug!("No metadata for {:?}: {}", path, e);
                None
            }
        }
    }

    /// Run a send while feeding its progress ticks to the renderer
    async fn tracked<F, Fut>(&self, ctx: &ProgressContext, send: F) -> Result<SentMessage>
    where
        F: FnOnce(ProgressSender) -> Fut,
        Fut: Future<Output = Result<SentMessage>>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        // The sender moves into the send future, so the drain loop ends
        // once the transport is done with it
        let send = send(tx);
        let drain = async {
            while let Some(current) = rx.recv().await {
                self.renderer.report(self.transport, ctx, current).await;
            }
        };

        let (sent, ()) = tokio::join!(send, drain);
        sent
    }
}
