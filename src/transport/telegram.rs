use super::{MediaItem, MediaKind, MessageRef, Outbound, TransportError};
use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, FileId, InputFile, InputMedia, InputMediaPhoto, InputMediaVideo, ReplyParameters,
};
use tracing::debug;

/// [`Outbound`] backed by the Telegram Bot API.
///
/// No retries are attempted: a failed request is returned to the caller,
/// which logs it and notifies the submitter.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    /// Wrap a bot instance
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn input_file(item: &MediaItem) -> InputFile {
    InputFile::file_id(FileId(item.file_id.clone()))
}

fn input_media(item: MediaItem) -> InputMedia {
    let file = input_file(&item);
    match item.kind {
        MediaKind::Photo => {
            let mut media = InputMediaPhoto::new(file);
            media.caption = item.caption;
            InputMedia::Photo(media)
        }
        MediaKind::Video => {
            let mut media = InputMediaVideo::new(file);
            media.caption = item.caption;
            InputMedia::Video(media)
        }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.bot.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn send_media_batch(
        &self,
        chat_id: ChatId,
        media: Vec<MediaItem>,
    ) -> Result<(), TransportError> {
        if media.is_empty() {
            return Err(TransportError::EmptyBatch);
        }
        let count = media.len();
        let group: Vec<InputMedia> = media.into_iter().map(input_media).collect();
        self.bot.send_media_group(chat_id, group).await?;
        debug!(chat_id = chat_id.0, count, "Sent media group");
        Ok(())
    }

    async fn send_single_media(
        &self,
        chat_id: ChatId,
        media: MediaItem,
    ) -> Result<(), TransportError> {
        let file = input_file(&media);
        match media.kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat_id, file);
                if let Some(caption) = media.caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat_id, file);
                if let Some(caption) = media.caption {
                    req = req.caption(caption);
                }
                req.await?;
            }
        }
        Ok(())
    }

    async fn reply(&self, to: &MessageRef, text: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(to.chat_id, text)
            .reply_parameters(ReplyParameters::new(to.message_id))
            .await?;
        Ok(())
    }

    async fn reply_document(&self, to: &MessageRef, path: &Path) -> Result<(), TransportError> {
        self.bot
            .send_document(to.chat_id, InputFile::file(path.to_path_buf()))
            .reply_parameters(ReplyParameters::new(to.message_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_media_carries_caption() {
        let media = input_media(MediaItem::photo("p1").with_caption(Some("hi".to_string())));
        match media {
            InputMedia::Photo(photo) => assert_eq!(photo.caption.as_deref(), Some("hi")),
            _ => panic!("expected photo"),
        }

        let media = input_media(MediaItem::video("v1"));
        match media {
            InputMedia::Video(video) => assert!(video.caption.is_none()),
            _ => panic!("expected video"),
        }
    }
}
