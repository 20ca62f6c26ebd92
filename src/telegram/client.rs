//! Telegram client implementation
//!
//! Uses grammers to talk to Telegram. The backend owns the connection for
//! the whole run; chats are resolved once and cached by id so later calls
//! only need the numeric identity.

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::media::{AudioMetadata, VideoMetadata};
use crate::prompt::{ask, ask_password};
use crate::telegram::{
    AccountInfo, ChatTransport, MediaUpload, ProgressReader, ProgressSender, SentMessage,
    StatusMessage,
};

use async_trait::async_trait;
use dashmap::DashMap;
use grammers_client::types::media::Uploaded;
use grammers_client::types::{Attribute, PackedChat};
use grammers_client::{Client, Config as ClientConfig, InitParams, InputMessage, SignInError};
use grammers_session::Session;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Offset between Bot API channel ids (`-100...`) and raw channel ids
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Who the user wants to upload to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    /// The account's own Saved Messages
    SelfChat,
    /// Numeric id, raw or Bot API style
    Id(i64),
    Username(String),
}

impl ChatTarget {
    /// Id as grammers reports it, without Bot API sign or prefix
    fn bare_id(id: i64) -> i64 {
        if id <= -CHANNEL_ID_OFFSET {
            -id - CHANNEL_ID_OFFSET
        } else {
            id.abs()
        }
    }
}

/// Interpret user input as a chat reference
pub fn parse_chat_target(input: &str) -> ChatTarget {
    let input = input.trim();

    if input.eq_ignore_ascii_case("me") || input.eq_ignore_ascii_case("self") {
        return ChatTarget::SelfChat;
    }

    match input.parse::<i64>() {
        Ok(id) => ChatTarget::Id(id),
        Err(_) => ChatTarget::Username(input.trim_start_matches('@').to_string()),
    }
}

/// Telegram backend sending files into a single chat
pub struct TelegramBackend {
    /// Configuration
    config: TelegramConfig,
    /// Connected client, set by `start`
    client: parking_lot::Mutex<Option<Client>>,
    /// Account fetched at startup
    account: parking_lot::Mutex<Option<AccountInfo>>,
    /// Resolved chats by id
    chats: DashMap<i64, PackedChat>,
}

impl TelegramBackend {
    /// Create a new Telegram backend
    pub fn new(config: TelegramConfig) -> Self {
        TelegramBackend {
            config,
            client: parking_lot::Mutex::new(None),
            account: parking_lot::Mutex::new(None),
            chats: DashMap::new(),
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.lock().is_some()
    }

    /// Account info, available after `start`
    pub fn account(&self) -> Option<AccountInfo> {
        self.account.lock().clone()
    }

    fn client(&self) -> Result<Client> {
        self.client
            .lock()
            .clone()
            .ok_or_else(|| Error::TelegramClient("Not connected".to_string()))
    }

    fn packed(&self, chat_id: i64) -> Result<PackedChat> {
        self.chats
            .get(&chat_id)
            .map(|chat| chat.value().clone())
            .ok_or_else(|| Error::ChatNotFound(chat_id.to_string()))
    }

    /// Connect, log in if needed and fetch the account
    pub async fn start(&self) -> Result<AccountInfo> {
        info!("Connecting to Telegram...");

        if self.config.api_id == 0 || self.config.api_hash.is_empty() {
            return Err(Error::TelegramClient(
                "API ID and hash are required. Get them from my.telegram.org".to_string(),
            ));
        }

        if let Some(parent) = self.config.session_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let session = Session::load_file_or_create(&self.config.session_file)?;

        let client = Client::connect(ClientConfig {
            session,
            api_id: self.config.api_id,
            api_hash: self.config.api_hash.clone(),
            params: InitParams {
                device_model: "uploadgram".to_string(),
                app_version: env!("CARGO_PKG_VERSION").to_string(),
                flood_sleep_threshold: self.config.flood_sleep_threshold,
                catch_up: false,
                ..Default::default()
            },
        })
        .await
        .map_err(|e| Error::TelegramClient(e.to_string()))?;

        debug!(
            "Client limits: {} workers, {} concurrent transmissions",
            self.config.workers, self.config.max_concurrent_transmissions
        );

        if !client.is_authorized().await? {
            self.login(&client).await?;
        }
        self.save_session(&client)?;

        let me = client.get_me().await?;
        let account = AccountInfo {
            first_name: me.raw.first_name.clone().unwrap_or_default(),
            premium: me.raw.premium,
        };

        println!("{} based on grammers started.", account.first_name);

        *self.client.lock() = Some(client);
        *self.account.lock() = Some(account.clone());
        Ok(account)
    }

    /// Interactive login with a phone number or a bot token
    async fn login(&self, client: &Client) -> Result<()> {
        info!("Session is not authorized, logging in");

        let login = ask("Enter your phone number (or bot token): ").await?;
        if login.is_empty() {
            return Err(Error::TelegramAuthRequired);
        }

        if login.contains(':') {
            client
                .bot_sign_in(&login)
                .await
                .map_err(|e| Error::TelegramClient(e.to_string()))?;
            info!("Signed in as bot");
            return Ok(());
        }

        let token = client
            .request_login_code(&login)
            .await
            .map_err(|e| Error::TelegramClient(e.to_string()))?;
        let code = ask("Enter the code you received: ").await?;

        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().unwrap_or("none").to_string();
                let password =
                    ask_password(format!("Enter your 2FA password (hint: {}): ", hint)).await?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| Error::TelegramClient(e.to_string()))?;
            }
            Err(e) => return Err(Error::TelegramClient(e.to_string())),
        }

        info!("Successfully signed in");
        Ok(())
    }

    fn save_session(&self, client: &Client) -> Result<()> {
        client.session().save_to_file(&self.config.session_file)?;
        debug!("Session saved to {:?}", self.config.session_file);
        Ok(())
    }

    /// Resolve user input to a chat id usable with the transport calls
    pub async fn resolve_chat(&self, input: &str) -> Result<i64> {
        let client = self.client()?;

        let packed = match parse_chat_target(input) {
            ChatTarget::SelfChat => client.get_me().await?.pack(),
            ChatTarget::Username(name) => client
                .resolve_username(&name)
                .await?
                .map(|chat| chat.pack())
                .ok_or_else(|| Error::ChatNotFound(input.to_string()))?,
            ChatTarget::Id(id) => {
                let wanted = ChatTarget::bare_id(id);
                let mut found = None;

                let mut dialogs = client.iter_dialogs();
                while let Some(dialog) = dialogs.next().await? {
                    if dialog.chat().id() == wanted {
                        found = Some(dialog.chat().pack());
                        break;
                    }
                }

                found.ok_or_else(|| Error::ChatNotFound(input.to_string()))?
            }
        };

        debug!("Resolved {:?} to chat {}", input, packed.id);
        let id = packed.id;
        self.chats.insert(id, packed);
        Ok(id)
    }

    /// Stream a local file to Telegram, reporting bytes as they are read
    async fn upload_with_progress(
        &self,
        client: &Client,
        path: &Path,
        progress: ProgressSender,
    ) -> Result<Uploaded> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len() as usize;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let mut reader = ProgressReader::new(file, progress);
        let uploaded = client.upload_stream(&mut reader, size, name).await?;
        Ok(uploaded)
    }

    async fn send_media<F>(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        progress: ProgressSender,
        attach: F,
    ) -> Result<SentMessage>
    where
        F: FnOnce(InputMessage, Uploaded) -> InputMessage + Send,
    {
        let client = self.client()?;
        let chat = self.packed(status.chat_id)?;

        debug!("Uploading {:?}", upload.path);
        let file = self.upload_with_progress(&client, &upload.path, progress).await?;

        let mut message =
            attach(InputMessage::html(&upload.caption), file).reply_to(Some(status.message_id));

        if let Some(thumb) = &upload.thumbnail {
            match client.upload_file(thumb).await {
                Ok(uploaded) => message = message.thumbnail(uploaded),
                Err(e) => warn!("Failed to upload thumbnail {:?}: {}", thumb, e),
            }
        }

        let sent = client.send_message(chat, message).await?;
        Ok(SentMessage {
            chat_id: status.chat_id,
            message_id: sent.id(),
        })
    }

    /// Disconnect from Telegram
    pub async fn stop(&self) {
        let client = self.client.lock().take();
        let name = self
            .account()
            .map(|a| a.first_name)
            .unwrap_or_else(|| "uploadgram".to_string());

        if let Some(client) = client {
            if let Err(e) = self.save_session(&client) {
                warn!("Failed to save session: {}", e);
            }
        }

        println!("{} stopped. Bye.", name);
    }
}

#[async_trait]
impl ChatTransport for TelegramBackend {
    async fn send_status(&self, chat_id: i64, text: &str, topic: Option<i32>) -> Result<StatusMessage> {
        let client = self.client()?;
        let chat = self.packed(chat_id)?;

        let message = client
            .send_message(chat, InputMessage::html(text).reply_to(topic))
            .await?;

        Ok(StatusMessage {
            chat_id,
            message_id: message.id(),
        })
    }

    async fn edit_status(&self, status: &StatusMessage, text: &str) -> Result<()> {
        let client = self.client()?;
        let chat = self.packed(status.chat_id)?;

        client
            .edit_message(chat, status.message_id, InputMessage::html(text))
            .await?;
        Ok(())
    }

    async fn delete_status(&self, status: &StatusMessage) -> Result<()> {
        let client = self.client()?;
        let chat = self.packed(status.chat_id)?;

        client.delete_messages(chat, &[status.message_id]).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        self.send_media(status, upload, progress, |message, file| message.file(file))
            .await
    }

    async fn send_video(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        video: VideoMetadata,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        self.send_media(status, upload, progress, move |message, file| {
            message.document(file).attribute(Attribute::Video {
                round_message: false,
                supports_streaming: true,
                duration: Duration::from_secs(video.duration as u64),
                w: video.width as i32,
                h: video.height as i32,
            })
        })
        .await
    }

    async fn send_audio(
        &self,
        status: &StatusMessage,
        upload: MediaUpload,
        audio: AudioMetadata,
        progress: ProgressSender,
    ) -> Result<SentMessage> {
        self.send_media(status, upload, progress, move |message, file| {
            message.document(file).attribute(Attribute::Audio {
                duration: Duration::from_secs(audio.duration as u64),
                title: audio.title,
                performer: audio.performer,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_target() {
        assert_eq!(parse_chat_target("me"), ChatTarget::SelfChat);
        assert_eq!(parse_chat_target(" SELF "), ChatTarget::SelfChat);
        assert_eq!(parse_chat_target("12345"), ChatTarget::Id(12345));
        assert_eq!(parse_chat_target("-1001234567890"), ChatTarget::Id(-1001234567890));
        assert_eq!(
            parse_chat_target("@durov"),
            ChatTarget::Username("durov".to_string())
        );
        assert_eq!(
            parse_chat_target("some_channel"),
            ChatTarget::Username("some_channel".to_string())
        );
    }

    #[test]
    fn test_bare_id() {
        assert_eq!(ChatTarget::bare_id(-1001234567890), 1234567890);
        assert_eq!(ChatTarget::bare_id(-4567), 4567);
        assert_eq!(ChatTarget::bare_id(777), 777);
    }

    #[test]
    fn test_not_connected() {
        let backend = TelegramBackend::new(TelegramConfig::default());
        assert!(!backend.is_connected());
        assert!(backend.account().is_none());
        assert!(matches!(backend.client(), Err(Error::TelegramClient(_))));
        assert!(matches!(backend.packed(1), Err(Error::ChatNotFound(_))));
    }
}
