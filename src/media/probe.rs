//! Media metadata probing
//!
//! Wraps `ffprobe` and exposes only the fields the uploader attaches to
//! video and audio messages. Every field is optional; callers pick their
//! own defaults.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Structured probe result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    /// Duration in seconds
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub author: Option<String>,
    pub album: Option<String>,
}

/// Attributes attached to a video message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub duration: u32,
    pub width: u32,
    pub height: u32,
}

/// Attributes attached to an audio message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioMetadata {
    pub duration: u32,
    pub title: Option<String>,
    pub performer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl MediaProbe {
    /// Parse `ffprobe -print_format json -show_format -show_streams` output
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let output: FfprobeOutput = serde_json::from_slice(data)
            .map_err(|e| Error::MediaTool(format!("Failed to parse ffprobe output: {}", e)))?;

        let visual = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));

        // Container tags first, stream tags as fallback (ogg keeps them there)
        let mut tags: Vec<&HashMap<String, String>> = Vec::new();
        if let Some(format) = &output.format {
            tags.push(&format.tags);
        }
        tags.extend(output.streams.iter().map(|s| &s.tags));

        let duration = output
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .or_else(|| output.streams.iter().find_map(|s| s.duration.as_deref()))
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0);

        Ok(MediaProbe {
            duration,
            width: visual.and_then(|s| s.width),
            height: visual.and_then(|s| s.height),
            title: find_tag(&tags, &["title"]),
            artist: find_tag(&tags, &["artist", "album_artist"]),
            author: find_tag(&tags, &["author", "composer"]),
            album: find_tag(&tags, &["album"]),
        })
    }

    /// Whole seconds, truncated
    pub fn duration_secs(&self) -> u32 {
        self.duration.map(|d| d as u32).unwrap_or(0)
    }

    /// Performer, falling back through artist, author, album
    pub fn performer(&self) -> Option<String> {
        self.artist
            .clone()
            .or_else(|| self.author.clone())
            .or_else(|| self.album.clone())
    }

    pub fn audio_metadata(&self) -> AudioMetadata {
        AudioMetadata {
            duration: self.duration_secs(),
            title: self.title.clone(),
            performer: self.performer(),
        }
    }
}

fn find_tag(tags: &[&HashMap<String, String>], names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        tags.iter().find_map(|map| {
            map.iter()
                .find(|(k, v)| k.eq_ignore_ascii_case(name) && !v.trim().is_empty())
                .map(|(_, v)| v.trim().to_string())
        })
    })
}

/// Runs ffprobe against local files
#[derive(Debug, Clone)]
pub struct MediaProber {
    program: PathBuf,
}

impl MediaProber {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        MediaProber {
            program: program.into(),
        }
    }

    /// Probe a file
    pub async fn probe(&self, path: &Path) -> Result<MediaProbe> {
        let output = Command::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::MediaTool(format!("Failed to run {:?}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::MediaTool(format!(
                "ffprobe exited with {} for {:?}",
                output.status, path
            )));
        }

        let probe = MediaProbe::from_json(&output.stdout)?;
        debug!("Probed {:?}: {:?}", path, probe);
        Ok(probe)
    }
}
