//! Album (media group) aggregation.
//!
//! Telegram delivers an album as separate messages sharing a media group id.
//! [`AlbumAggregator`] buffers them per album and flushes the whole album as
//! one grouped post once no new item has arrived for the configured delay.
//!
//! Each album owns at most one pending flush timer. A new item cancels the
//! album's timer and arms a fresh one; timers of other albums are untouched.
//! Every timer carries a generation number, and a woken timer only flushes if
//! its generation is still the album's current one (checked under the same
//! lock that `submit` holds), so an album instance is flushed at most once.

use crate::replies;
use crate::transport::{MediaItem, MessageRef, Outbound, Submitter, TransportError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::ChatId;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default debounce delay between the last album item and the flush.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_secs(3);

struct PendingTimer {
    generation: u64,
    cancel: CancellationToken,
}

/// Buffered items of one album together with the data of its first message.
struct AlbumEntry {
    items: Vec<MediaItem>,
    submitter: Submitter,
    first_message: MessageRef,
    timer: PendingTimer,
}

struct Inner {
    outbound: Arc<dyn Outbound>,
    creator: ChatId,
    delay: Duration,
    shutdown: CancellationToken,
    albums: Mutex<HashMap<String, AlbumEntry>>,
    next_generation: AtomicU64,
}

/// Debounce buffer that turns album messages into one grouped post.
///
/// Cloning is cheap and clones share the same buffer.
#[derive(Clone)]
pub struct AlbumAggregator {
    inner: Arc<Inner>,
}

impl AlbumAggregator {
    /// Create an aggregator delivering to `creator`.
    ///
    /// Pending flushes are dropped silently once `shutdown` is cancelled.
    #[must_use]
    pub fn new(
        outbound: Arc<dyn Outbound>,
        creator: ChatId,
        delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                outbound,
                creator,
                delay,
                shutdown,
                albums: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Add an item to an album and (re)arm the album's flush timer.
    ///
    /// The submitter and message of the first item of an album are kept for
    /// the whole album; later items only contribute their media.
    pub async fn submit(
        &self,
        album_id: String,
        media: MediaItem,
        submitter: Submitter,
        message: MessageRef,
    ) {
        let deadline = Instant::now() + self.inner.delay;
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.shutdown.child_token();
        let timer = PendingTimer {
            generation,
            cancel: cancel.clone(),
        };

        {
            let mut albums = self.inner.albums.lock().await;
            match albums.entry(album_id.clone()) {
                Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    entry.items.push(media);
                    entry.timer.cancel.cancel();
                    entry.timer = timer;
                    debug!(
                        album_id = %album_id,
                        items = entry.items.len(),
                        "Album item buffered, flush rescheduled"
                    );
                }
                Entry::Vacant(vacant) => {
                    info!(album_id = %album_id, submitter = %submitter, "Collecting new album");
                    vacant.insert(AlbumEntry {
                        items: vec![media],
                        submitter,
                        first_message: message,
                        timer,
                    });
                }
            }
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner
                .flush_at(album_id, deadline, generation, cancel)
                .await;
        });
    }

    /// Flush an album immediately.
    ///
    /// Pops the album and delivers it. Does nothing if the album is not
    /// buffered (for instance because it was already flushed).
    pub async fn flush(&self, album_id: &str) {
        if let Some(entry) = self.inner.take(album_id, None).await {
            self.inner.deliver(album_id, entry).await;
        }
    }

    /// Number of albums currently collecting items.
    pub async fn pending_albums(&self) -> usize {
        self.inner.albums.lock().await.len()
    }
}

impl Inner {
    async fn flush_at(
        &self,
        album_id: String,
        deadline: Instant,
        generation: u64,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(album_id = %album_id, generation, "Album flush cancelled");
                return;
            }
            () = tokio::time::sleep_until(deadline) => {}
        }

        if let Some(entry) = self.take(&album_id, Some(generation)).await {
            self.deliver(&album_id, entry).await;
        }
    }

    /// Remove an album from the buffer.
    ///
    /// With `generation` set, the album is only removed if that timer is
    /// still the album's current one and has not been cancelled.
    async fn take(&self, album_id: &str, generation: Option<u64>) -> Option<AlbumEntry> {
        let mut albums = self.albums.lock().await;
        if let Some(generation) = generation {
            let entry = albums.get(album_id)?;
            if entry.timer.generation != generation || entry.timer.cancel.is_cancelled() {
                return None;
            }
        }
        let entry = albums.remove(album_id)?;
        entry.timer.cancel.cancel();
        Some(entry)
    }

    async fn deliver(&self, album_id: &str, entry: AlbumEntry) {
        let AlbumEntry {
            items,
            submitter,
            first_message,
            ..
        } = entry;

        if items.is_empty() {
            return;
        }

        // Only the first message's caption survives, on the first item.
        let caption = first_message.caption.clone();
        let items: Vec<MediaItem> = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let caption = if i == 0 { caption.clone() } else { None };
                item.with_caption(caption)
            })
            .collect();
        let count = items.len();

        match self.send_album(items, &submitter, &first_message).await {
            Ok(()) => info!(
                album_id = %album_id,
                count,
                submitter = %submitter,
                "Album forwarded to creator"
            ),
            Err(e) => {
                error!(
                    album_id = %album_id,
                    count,
                    submitter = %submitter,
                    error = ?e,
                    "Failed to forward album: {e}"
                );
                if let Err(e) = self
                    .outbound
                    .reply(&first_message, replies::DELIVERY_FAILED)
                    .await
                {
                    warn!(album_id = %album_id, "Failed to notify submitter about album failure: {e}");
                }
            }
        }
    }

    async fn send_album(
        &self,
        items: Vec<MediaItem>,
        submitter: &Submitter,
        first_message: &MessageRef,
    ) -> Result<(), TransportError> {
        let count = items.len();
        self.outbound
            .send_text(self.creator, &replies::album_summary(count, submitter))
            .await?;
        self.outbound.send_media_batch(self.creator, items).await?;
        self.outbound
            .reply(first_message, &replies::album_received(count))
            .await?;
        Ok(())
    }
}
