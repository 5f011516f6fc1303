//! Testing helpers.
//!
//! Provides an in-memory [`Outbound`] that records every delivery in order,
//! optionally failing the operations a test selects.

use crate::transport::{MediaItem, MessageRef, Outbound, TransportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use teloxide::types::{ChatId, MessageId};

/// One delivery observed by [`RecordingOutbound`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// `send_text`
    Text(ChatId, String),
    /// `send_media_batch`
    Batch(ChatId, Vec<MediaItem>),
    /// `send_single_media`
    Single(ChatId, MediaItem),
    /// `reply`
    Reply(MessageId, String),
    /// `reply_document`
    Document(MessageId, PathBuf),
}

/// Which operation a [`RecordingOutbound`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// `send_text`
    Text,
    /// `send_media_batch`
    Batch,
    /// `send_single_media`
    Single,
    /// `reply_document`
    Document,
}

/// Outbound transport that records deliveries instead of sending them
#[derive(Debug, Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<Sent>>,
    fail_on: Option<FailOn>,
}

impl RecordingOutbound {
    /// Transport where every operation succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport where the given operation fails (and is not recorded)
    #[must_use]
    pub fn failing(fail_on: FailOn) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_on: Some(fail_on),
        }
    }

    /// Snapshot of all deliveries so far, in order
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of grouped sends so far
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Batch(..)))
            .count()
    }

    fn record(&self, op: Option<FailOn>, sent: Sent) -> Result<(), TransportError> {
        if op.is_some() && op == self.fail_on {
            return Err(TransportError::Io(std::io::Error::other(
                "simulated transport failure",
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sent);
        Ok(())
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.record(Some(FailOn::Text), Sent::Text(chat_id, text.to_string()))
    }

    async fn send_media_batch(
        &self,
        chat_id: ChatId,
        media: Vec<MediaItem>,
    ) -> Result<(), TransportError> {
        self.record(Some(FailOn::Batch), Sent::Batch(chat_id, media))
    }

    async fn send_single_media(
        &self,
        chat_id: ChatId,
        media: MediaItem,
    ) -> Result<(), TransportError> {
        self.record(Some(FailOn::Single), Sent::Single(chat_id, media))
    }

    async fn reply(&self, to: &MessageRef, text: &str) -> Result<(), TransportError> {
        self.record(None, Sent::Reply(to.message_id, text.to_string()))
    }

    async fn reply_document(&self, to: &MessageRef, path: &Path) -> Result<(), TransportError> {
        self.record(
            Some(FailOn::Document),
            Sent::Document(to.message_id, path.to_path_buf()),
        )
    }
}
