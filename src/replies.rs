//! Texts the bot sends to users and to the creator chat.

use crate::transport::{MediaKind, Submitter};

/// Reply to `/start`
pub const START: &str = "Send your message or a photo.";
/// Reply after a text message was forwarded
pub const MESSAGE_RECEIVED: &str = "Message received!";
/// Reply when forwarding failed
pub const DELIVERY_FAILED: &str = "Failed to deliver your message. Please try again later.";
/// Reply when an unexpected error escaped a handler
pub const INTERNAL_ERROR: &str = "⚠️ Internal error. Please try again later.";
/// Reply to `/log` from a user outside the allow-list
pub const ACCESS_DENIED: &str = "Insufficient permissions.";
/// Reply to `/log` when today's log file does not exist
pub const LOGS_NOT_FOUND: &str = "Logs not found.";

/// Count summary sent to the creator ahead of an album
#[must_use]
pub fn album_summary(count: usize, submitter: &Submitter) -> String {
    format!("Album of {count} media from {submitter}")
}

/// Acknowledgement replied to the first message of an album
#[must_use]
pub fn album_received(count: usize) -> String {
    format!("Album of {count} media received! It will be published soon.")
}

/// Caption for a single forwarded photo or video
#[must_use]
pub fn single_media_caption(
    kind: MediaKind,
    submitter: &Submitter,
    caption: Option<&str>,
) -> String {
    match caption {
        Some(caption) => format!("{} from {submitter}\n\n{caption}", kind.label()),
        None => format!("{} from {submitter}", kind.label()),
    }
}

/// Acknowledgement replied after a single photo or video was forwarded
#[must_use]
pub const fn media_received(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "Photo received!",
        MediaKind::Video => "Video received!",
    }
}

/// Text forwarded to the creator for a plain message
#[must_use]
pub fn forwarded_text(submitter: &Submitter, text: &str) -> String {
    format!("Message from {submitter}:\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Submitter {
        Submitter {
            id: 7,
            username: Some("user".to_string()),
        }
    }

    #[test]
    fn test_single_media_caption() {
        assert_eq!(
            single_media_caption(MediaKind::Photo, &user(), None),
            "Photo from @user"
        );
        assert_eq!(
            single_media_caption(MediaKind::Photo, &user(), Some("sunset")),
            "Photo from @user\n\nsunset"
        );
        assert_eq!(
            single_media_caption(MediaKind::Video, &user(), None),
            "Video from @user"
        );
    }

    #[test]
    fn test_album_summary() {
        assert_eq!(album_summary(2, &user()), "Album of 2 media from @user");
    }
}
