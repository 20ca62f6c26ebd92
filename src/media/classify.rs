//! Extension based presentation choice

use crate::config::UploadConfig;
use std::fmt;

/// How a file is presented in the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Document,
    Video,
    Audio,
}

impl Presentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presentation::Document => "DOCUMENT",
            Presentation::Video => "VIDEO",
            Presentation::Audio => "AUDIO",
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercase text after the last '.', or empty when there is none
pub fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_uppercase(),
        None => String::new(),
    }
}

/// Pick the presentation for a file name
pub fn classify(file_name: &str, force_document: bool, config: &UploadConfig) -> Presentation {
    if force_document {
        return Presentation::Document;
    }

    let ext = file_extension(file_name);
    if ext.is_empty() {
        Presentation::Document
    } else if config.is_video_extension(&ext) {
        Presentation::Video
    } else if config.is_audio_extension(&ext) {
        Presentation::Audio
    } else {
        Presentation::Document
    }
}
