//! Thumbnail extraction for videos

use crate::config::UploadConfig;
use crate::media::classify::file_extension;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::process::Command;
use tracing::debug;

/// Grabs a single JPEG frame out of a video with ffmpeg
#[derive(Debug, Clone)]
pub struct ThumbnailExtractor {
    program: PathBuf,
    video_extensions: Vec<String>,
}

impl ThumbnailExtractor {
    pub fn new(config: &UploadConfig) -> Self {
        ThumbnailExtractor {
            program: config.ffmpeg_path.clone(),
            video_extensions: config.video_extensions.clone(),
        }
    }

    /// Write a frame taken near `timestamp` seconds into `output_dir`
    ///
    /// Returns `None` when the file is not a known video type or ffmpeg
    /// produced nothing. The frame is removed when the returned path drops.
    pub async fn extract(&self, video: &Path, output_dir: &Path, timestamp: f64) -> Option<TempPath> {
        let name = video.file_name()?.to_string_lossy();
        let ext = file_extension(&name);
        if ext.is_empty() || !self.video_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return None;
        }

        // Owned before ffmpeg starts so a cancelled run leaves nothing behind
        let output = TempPath::from_path(output_dir.join(format!(
            "thumb_{}.jpg",
            chrono::Utc::now().timestamp_millis()
        )));

        // -ss before -i seeks on the demuxer instead of decoding up to the frame
        let status = Command::new(&self.program)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-ss")
            .arg(timestamp.max(0.0).to_string())
            .arg("-i")
            .arg(video)
            .arg("-vframes")
            .arg("1")
            .arg("-q:v")
            .arg("2")
            .arg(&*output)
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if !status.success() => {
                debug!("ffmpeg exited with {} for {:?}", status, video)
            }
            Err(e) => debug!("Failed to run {:?}: {}", self.program, e),
            Ok(_) => {}
        }

        if output.exists() {
            Some(output)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        // Writes the last argument (the output path) and leaves a marker behind
        let script = dir.join("fake-ffmpeg");
        let marker = dir.join("invoked");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nfor last; do :; done\necho frame > \"$last\"\ntouch \"{}\"\n",
                marker.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn extractor(program: PathBuf) -> ThumbnailExtractor {
        let config = UploadConfig {
            ffmpeg_path: program,
            ..UploadConfig::default()
        };
        ThumbnailExtractor::new(&config)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_from_video() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.MP4");
        std::fs::write(&video, b"not really a video").unwrap();

        let thumbs = extractor(fake_ffmpeg(dir.path()));
        let thumb = thumbs.extract(&video, dir.path(), 3.5).await.unwrap();

        assert!(thumb.exists());
        assert!(thumb.file_name().unwrap().to_string_lossy().starts_with("thumb_"));
        assert_eq!(thumb.extension().unwrap(), "jpg");
        assert!(dir.path().join("invoked").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_video_skips_tool() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.txt");
        std::fs::write(&doc, b"text").unwrap();

        let thumbs = extractor(fake_ffmpeg(dir.path()));
        assert!(thumbs.extract(&doc, dir.path(), 0.0).await.is_none());
        assert!(!dir.path().join("invoked").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_frame_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.webm");
        std::fs::write(&video, b"not really a video").unwrap();

        let thumbs = extractor(fake_ffmpeg(dir.path()));
        let thumb = thumbs.extract(&video, dir.path(), 0.0).await.unwrap();
        let path = thumb.to_path_buf();
        assert!(path.exists());

        drop(thumb);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_tool_failure_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mkv");
        std::fs::write(&video, b"junk").unwrap();

        let thumbs = extractor(PathBuf::from("uploadgram-test-no-such-ffmpeg"));
        assert!(thumbs.extract(&video, dir.path(), 1.0).await.is_none());
    }
}
