use crate::transport::{MediaItem, MessageRef, Submitter};
use teloxide::types::Message;

/// The parts of an incoming Telegram message the relay cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    /// Who sent the message
    pub submitter: Submitter,
    /// Handle used to reply to the message; carries its caption
    pub source: MessageRef,
    /// Message text, if it is a text message
    pub text: Option<String>,
    /// Photo or video carried by the message, without caption
    pub media: Option<MediaItem>,
    /// Album (media group) id, if the message belongs to one
    pub album_id: Option<String>,
}

impl Incoming {
    /// Extract the relay-relevant parts of a Telegram message.
    ///
    /// For photos the largest size is used. Messages without sender get
    /// user id 0.
    #[must_use]
    pub fn from_message(msg: &Message) -> Self {
        let submitter = msg.from.as_ref().map_or(
            Submitter {
                id: 0,
                username: None,
            },
            |user| Submitter {
                id: user.id.0.cast_signed(),
                username: user.username.clone(),
            },
        );

        let media = if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
            Some(MediaItem::photo(photo.file.id.to_string()))
        } else {
            msg.video()
                .map(|video| MediaItem::video(video.file.id.to_string()))
        };

        Self {
            submitter,
            source: MessageRef {
                chat_id: msg.chat.id,
                message_id: msg.id,
                caption: msg.caption().map(ToString::to_string),
            },
            text: msg.text().map(ToString::to_string),
            media,
            album_id: msg.media_group_id().map(ToString::to_string),
        }
    }
}
