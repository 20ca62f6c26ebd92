//! Uploading a file or a whole directory tree
//!
//! Files are sent one at a time in sorted path order, with a fixed pause
//! between them. Oversized files are skipped before any network call.

use crate::config::UploadConfig;
use crate::error::Result;
use crate::telegram::{ChatTransport, StatusMessage};
use crate::upload::progress::ProgressRenderer;
use crate::upload::single::{FileUploader, UploadOptions, UploadOutcome};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to each file of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub uploaded: Vec<PathBuf>,
    /// Larger than the account's limit, never sent
    pub oversized: Vec<PathBuf>,
    /// Vanished between listing and sending
    pub missing: Vec<PathBuf>,
    /// Send failed; the batch moved on
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.oversized.len() + self.missing.len() + self.failed.len()
    }
}

/// All regular files below `root`, sorted by their full path
///
/// Only an unreadable `root` is an error; anything below it that cannot be
/// read is skipped.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(root)?;
    walk_entries(entries, &mut files);
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) {
    match std::fs::read_dir(dir) {
        Ok(entries) => walk_entries(entries, files),
        Err(e) => warn!("Skipping unreadable directory {:?}: {}", dir, e),
    }
}

fn walk_entries(entries: std::fs::ReadDir, files: &mut Vec<PathBuf>) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                debug!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if file_type.is_dir() {
            walk(&path, files);
        } else if file_type.is_file() {
            files.push(path);
        } else if file_type.is_symlink() {
            // Follow links to files, never into directories
            if std::fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
                files.push(path);
            }
        }
    }
}

/// Drives a [`FileUploader`] over a path
pub struct BatchUploader<'a, T: ?Sized> {
    uploader: FileUploader<'a, T>,
    pacing: Duration,
}

impl<'a, T: ChatTransport + ?Sized> BatchUploader<'a, T> {
    pub fn new(transport: &'a T, renderer: &'a ProgressRenderer, config: &'a UploadConfig) -> Self {
        BatchUploader {
            uploader: FileUploader::new(transport, renderer, config),
            pacing: config.pacing_delay(),
        }
    }

    /// Upload `root`, a single file or a directory
    ///
    /// Returns `None` without doing anything when `root` does not exist.
    pub async fn upload_path(
        &self,
        root: &Path,
        max_size: u64,
        status: &StatusMessage,
        options: &UploadOptions,
    ) -> Result<Option<BatchReport>> {
        if !root.exists() {
            warn!("{:?} does not exist", root);
            return Ok(None);
        }

        let files = if root.is_dir() {
            collect_files(root)?
        } else {
            vec![root.to_path_buf()]
        };
        info!("Uploading {} file(s) from {:?}", files.len(), root);

        let mut report = BatchReport::default();

        for (index, file) in files.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let size = match std::fs::metadata(file) {
                Ok(meta) => meta.len(),
                Err(_) => {
                    report.missing.push(file.clone());
                    continue;
                }
            };

            if size > max_size {
                debug!("Skipping {:?}: {} bytes is over the {} byte limit", file, size, max_size);
                report.oversized.push(file.clone());
                continue;
            }

            match self.uploader.upload(file, status, options).await {
                Ok(UploadOutcome::Sent(message)) => {
                    debug!("Sent {:?} as message {}", file, message.message_id);
                    if options.delete_on_success {
                        if let Err(e) = tokio::fs::remove_file(file).await {
                            debug!("Failed to delete {:?}: {}", file, e);
                        }
                    }
                    report.uploaded.push(file.clone());
                }
                Ok(UploadOutcome::Missing) => report.missing.push(file.clone()),
                Err(e) => {
                    warn!("Failed to upload {:?}: {}", file, e);
                    report.failed.push((file.clone(), e.to_string()));
                }
            }
        }

        Ok(Some(report))
    }
}
