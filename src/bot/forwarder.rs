use crate::album::AlbumAggregator;
use crate::bot::Incoming;
use crate::replies;
use crate::transport::{MediaItem, MessageRef, Outbound, Submitter, TransportError};
use anyhow::Result;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Relays user messages to the creator chat.
///
/// Album items are handed to the [`AlbumAggregator`]; single photos, videos
/// and texts are forwarded immediately.
pub struct Forwarder {
    outbound: Arc<dyn Outbound>,
    albums: AlbumAggregator,
    creator: ChatId,
    shutdown: CancellationToken,
}

impl Forwarder {
    /// Create a forwarder delivering to `creator`
    #[must_use]
    pub fn new(
        outbound: Arc<dyn Outbound>,
        albums: AlbumAggregator,
        creator: ChatId,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            outbound,
            albums,
            creator,
            shutdown,
        }
    }

    /// The album buffer used by this forwarder
    #[must_use]
    pub const fn albums(&self) -> &AlbumAggregator {
        &self.albums
    }

    /// Route one incoming message.
    ///
    /// Delivery failures are reported to the submitter and are not returned
    /// as errors.
    ///
    /// # Errors
    ///
    /// Returns an error only if a failure could not be handled here.
    pub async fn handle(&self, incoming: Incoming) -> Result<()> {
        if self.shutdown.is_cancelled() {
            debug!("Shutdown in progress, ignoring message from {}", incoming.submitter);
            return Ok(());
        }

        let Incoming {
            submitter,
            source,
            text,
            media,
            album_id,
        } = incoming;

        if let Some(album_id) = album_id {
            match media {
                Some(media) => self.albums.submit(album_id, media, submitter, source).await,
                None => debug!(album_id = %album_id, "Ignoring album item without photo or video"),
            }
            return Ok(());
        }

        if let Some(media) = media {
            info!("Forwarding {} from {submitter}", media.kind.label());
            let result = self.forward_media(media, &submitter, &source).await;
            return self.finish(result, &submitter, &source).await;
        }

        if let Some(text) = text {
            info!("Forwarding message from {submitter}");
            let result = self.forward_text(&text, &submitter, &source).await;
            return self.finish(result, &submitter, &source).await;
        }

        debug!("Ignoring unsupported message from {submitter}");
        Ok(())
    }

    async fn forward_media(
        &self,
        media: MediaItem,
        submitter: &Submitter,
        source: &MessageRef,
    ) -> Result<(), TransportError> {
        let kind = media.kind;
        let caption = replies::single_media_caption(kind, submitter, source.caption.as_deref());
        self.outbound
            .send_single_media(self.creator, media.with_caption(Some(caption)))
            .await?;
        self.outbound
            .reply(source, replies::media_received(kind))
            .await
    }

    async fn forward_text(
        &self,
        text: &str,
        submitter: &Submitter,
        source: &MessageRef,
    ) -> Result<(), TransportError> {
        self.outbound
            .send_text(self.creator, &replies::forwarded_text(submitter, text))
            .await?;
        self.outbound.reply(source, replies::MESSAGE_RECEIVED).await
    }

    async fn finish(
        &self,
        result: Result<(), TransportError>,
        submitter: &Submitter,
        source: &MessageRef,
    ) -> Result<()> {
        if let Err(e) = result {
            error!(error = ?e, "Failed to forward message from {submitter}: {e}");
            if let Err(e) = self.outbound.reply(source, replies::DELIVERY_FAILED).await {
                warn!("Failed to notify {submitter} about delivery failure: {e}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::DEFAULT_FLUSH_DELAY;
    use crate::testing::{FailOn, RecordingOutbound, Sent};
    use std::time::Duration;
    use teloxide::types::MessageId;

    const CREATOR: ChatId = ChatId(1000);

    fn forwarder(outbound: Arc<RecordingOutbound>, shutdown: CancellationToken) -> Forwarder {
        let albums = AlbumAggregator::new(
            outbound.clone(),
            CREATOR,
            DEFAULT_FLUSH_DELAY,
            shutdown.clone(),
        );
        Forwarder::new(outbound, albums, CREATOR, shutdown)
    }

    fn incoming(id: i32, caption: Option<&str>) -> Incoming {
        Incoming {
            submitter: Submitter {
                id: 7,
                username: Some("user".to_string()),
            },
            source: MessageRef {
                chat_id: ChatId(7),
                message_id: MessageId(id),
                caption: caption.map(ToString::to_string),
            },
            text: None,
            media: None,
            album_id: None,
        }
    }

    #[tokio::test]
    async fn test_single_photo_is_sent_immediately() -> Result<()> {
        let outbound = Arc::new(RecordingOutbound::new());
        let forwarder = forwarder(outbound.clone(), CancellationToken::new());

        let mut msg = incoming(1, None);
        msg.media = Some(MediaItem::photo("P1"));
        forwarder.handle(msg).await?;

        let mut msg = incoming(2, Some("look"));
        msg.media = Some(MediaItem::photo("P2"));
        forwarder.handle(msg).await?;

        assert_eq!(
            outbound.sent(),
            vec![
                Sent::Single(
                    CREATOR,
                    MediaItem::photo("P1").with_caption(Some("Photo from @user".to_string()))
                ),
                Sent::Reply(MessageId(1), "Photo received!".to_string()),
                Sent::Single(
                    CREATOR,
                    MediaItem::photo("P2")
                        .with_caption(Some("Photo from @user\n\nlook".to_string()))
                ),
                Sent::Reply(MessageId(2), "Photo received!".to_string()),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_text_is_forwarded() -> Result<()> {
        let outbound = Arc::new(RecordingOutbound::new());
        let forwarder = forwarder(outbound.clone(), CancellationToken::new());

        let mut msg = incoming(3, None);
        msg.text = Some("hello".to_string());
        forwarder.handle(msg).await?;

        assert_eq!(
            outbound.sent(),
            vec![
                Sent::Text(CREATOR, "Message from @user:\n\nhello".to_string()),
                Sent::Reply(MessageId(3), replies::MESSAGE_RECEIVED.to_string()),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_message_is_ignored() -> Result<()> {
        let outbound = Arc::new(RecordingOutbound::new());
        let forwarder = forwarder(outbound.clone(), CancellationToken::new());

        forwarder.handle(incoming(4, None)).await?;

        let mut msg = incoming(5, None);
        msg.album_id = Some("A1".to_string());
        forwarder.handle(msg).await?;

        assert!(outbound.sent().is_empty());
        assert_eq!(forwarder.albums().pending_albums().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_single_send_notifies_submitter() -> Result<()> {
        let outbound = Arc::new(RecordingOutbound::failing(FailOn::Single));
        let forwarder = forwarder(outbound.clone(), CancellationToken::new());

        let mut msg = incoming(6, None);
        msg.media = Some(MediaItem::video("V1"));
        forwarder.handle(msg).await?;

        assert_eq!(
            outbound.sent(),
            vec![Sent::Reply(MessageId(6), replies::DELIVERY_FAILED.to_string())]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_album_items_are_debounced() -> Result<()> {
        let outbound = Arc::new(RecordingOutbound::new());
        let forwarder = forwarder(outbound.clone(), CancellationToken::new());

        for (id, file) in [(1, "P1"), (2, "P2")] {
            let mut msg = incoming(id, None);
            msg.media = Some(MediaItem::photo(file));
            msg.album_id = Some("A1".to_string());
            forwarder.handle(msg).await?;
        }
        assert!(outbound.sent().is_empty());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(outbound.batch_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_messages_ignored_after_shutdown() -> Result<()> {
        let outbound = Arc::new(RecordingOutbound::new());
        let shutdown = CancellationToken::new();
        let forwarder = forwarder(outbound.clone(), shutdown.clone());
        shutdown.cancel();

        let mut msg = incoming(7, None);
        msg.text = Some("late".to_string());
        forwarder.handle(msg).await?;

        assert!(outbound.sent().is_empty());
        Ok(())
    }
}
