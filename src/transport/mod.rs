//! Outbound transport abstraction.
//!
//! The relay logic only talks to Telegram through the [`Outbound`] trait, so
//! album flushing and forwarding can be driven by a recording transport in
//! tests and by [`TelegramOutbound`] in production.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use teloxide::types::{ChatId, MessageId};
use thiserror::Error;

/// Telegram implementation of [`Outbound`]
pub mod telegram;

pub use telegram::TelegramOutbound;

/// Errors that can occur while delivering messages
#[derive(Error, Debug)]
pub enum TransportError {
    /// Telegram Bot API request failed
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),
    /// Standard I/O error (e.g. reading a document to upload)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A grouped send was requested with no media
    #[error("Media batch is empty")]
    EmptyBatch,
}

/// Kind of media a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Photo (the largest available size is forwarded)
    Photo,
    /// Video
    Video,
}

impl MediaKind {
    /// Human-readable label used in forwarded captions
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Photo => "Photo",
            Self::Video => "Video",
        }
    }
}

/// A media reference that can be re-sent by file id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Photo or video
    pub kind: MediaKind,
    /// Telegram file id of the media
    pub file_id: String,
    /// Caption attached to this item when sent
    pub caption: Option<String>,
}

impl MediaItem {
    /// Create a photo reference without caption
    pub fn photo(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Photo,
            file_id: file_id.into(),
            caption: None,
        }
    }

    /// Create a video reference without caption
    pub fn video(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            file_id: file_id.into(),
            caption: None,
        }
    }

    /// Replace the caption, keeping the media reference
    #[must_use]
    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }
}

/// Identity of the user who sent a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    /// Telegram user id (0 if unknown)
    pub id: i64,
    /// Telegram username, if the user has one
    pub username: Option<String>,
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "@{username}"),
            None => write!(f, "@{}", self.id),
        }
    }
}

/// Handle to an originating message: where to reply and what caption it had
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Chat the message was sent in
    pub chat_id: ChatId,
    /// Id of the message inside that chat
    pub message_id: MessageId,
    /// Caption of the message, if any
    pub caption: Option<String>,
}

/// Outbound side of the Telegram transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;
    /// Send several media items as one grouped post, preserving order
    async fn send_media_batch(
        &self,
        chat_id: ChatId,
        media: Vec<MediaItem>,
    ) -> Result<(), TransportError>;
    /// Send one media item with its caption
    async fn send_single_media(
        &self,
        chat_id: ChatId,
        media: MediaItem,
    ) -> Result<(), TransportError>;
    /// Reply to a message with text
    async fn reply(&self, to: &MessageRef, text: &str) -> Result<(), TransportError>;
    /// Reply to a message with a local file as document
    async fn reply_document(&self, to: &MessageRef, path: &Path) -> Result<(), TransportError>;
}
