//! Error types for uploadgram

use grammers_mtsender::InvocationError;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while uploading
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Telegram client error: {0}")]
    TelegramClient(String),

    #[error("Telegram authorization required")]
    TelegramAuthRequired,

    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// The server asked us to wait before issuing more requests
    #[error("Flood wait of {seconds} seconds requested")]
    FloodWait { seconds: u32 },

    #[error("Media tool error: {0}")]
    MediaTool(String),
}

impl From<InvocationError> for Error {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::Rpc(rpc) if rpc.name == "FLOOD_WAIT" => Error::FloodWait {
                seconds: rpc.value.unwrap_or(0),
            },
            other => Error::TelegramClient(other.to_string()),
        }
    }
}

impl Error {
    /// Wait mandated by the server, if this is a rate-limit signal
    pub fn flood_wait(&self) -> Option<std::time::Duration> {
        match self {
            Error::FloodWait { seconds } => Some(std::time::Duration::from_secs(*seconds as u64)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flood_wait_duration() {
        let err = Error::FloodWait { seconds: 7 };
        assert_eq!(err.flood_wait(), Some(std::time::Duration::from_secs(7)));
        assert!(Error::Config("x".into()).flood_wait().is_none());
    }
}
