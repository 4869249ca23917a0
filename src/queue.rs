//! The durable queue of mentions waiting to be handled.
//!
//! Mentions are kept newest first, the order in which the API returns them.
//! New fetches are prepended and handling pops from the tail, so mentions are
//! always handled oldest first regardless of how fetches were batched.

use log::{error, info, warn};
use std::collections::VecDeque;

use crate::store::{StateStore, StoreError};
use crate::twitter::{compare_ids, is_newer, ApiError, Mention, ResilientClient};

/// Number of mentions handled between two resupply fetches.
pub const RESUPPLY_EVERY: usize = 10;

pub struct MentionQueue {
    pending: VecDeque<Mention>,
    watermark: Option<String>,
    store: StateStore,
}

impl MentionQueue {
    /// Restores the queue and watermark persisted in `store`.
    ///
    /// Snapshot entries at or below the watermark were already started before
    /// the last shutdown and are dropped.
    pub fn load_persisted(store: StateStore) -> Result<Self, StoreError> {
        let watermark = store.load_watermark()?.map(|w| w.last_mention_id);
        let snapshot = store.load_queue()?;
        let restored = snapshot.len();

        let pending: VecDeque<Mention> = snapshot
            .into_iter()
            .filter(|m| watermark.as_deref().map_or(true, |w| is_newer(&m.id, w)))
            .collect();

        if pending.len() < restored {
            warn!(
                "Dropped {} queued mentions at or below watermark {}",
                restored - pending.len(),
                watermark.as_deref().unwrap_or("-")
            );
        }
        info!(
            "Restored {} pending mentions (watermark: {})",
            pending.len(),
            watermark.as_deref().unwrap_or("none")
        );

        Ok(MentionQueue {
            pending,
            watermark,
            store,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The last mention whose processing was started.
    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    /// The newest mention id the bot knows about: the newest queued mention,
    /// or the watermark when the queue is empty.
    pub fn last_known_id(&self) -> Option<&str> {
        self.pending
            .front()
            .map(|m| m.id.as_str())
            .or(self.watermark.as_deref())
    }

    /// Pending mentions, newest first.
    pub fn pending(&self) -> impl Iterator<Item = &Mention> {
        self.pending.iter()
    }

    /// Fetches mentions newer than [`last_known_id`](Self::last_known_id),
    /// prepends them and persists the queue.
    ///
    /// Returns the number of mentions added.
    pub async fn fetch_new(&mut self, client: &ResilientClient) -> Result<usize, ApiError> {
        let since_id = self.last_known_id().map(str::to_string);
        let mut fetched = client.fetch_mentions(since_id.as_deref()).await?;

        if let Some(since_id) = since_id.as_deref() {
            fetched.retain(|m| is_newer(&m.id, since_id));
        }
        fetched.sort_by(|a, b| compare_ids(&b.id, &a.id));
        fetched.dedup_by(|a, b| a.id == b.id);

        let added = fetched.len();
        for mention in fetched.into_iter().rev() {
            self.pending.push_front(mention);
        }

        if added > 0 {
            info!(
                "Queued {} new mentions ({} pending)",
                added,
                self.pending.len()
            );
        } else {
            info!("No new mentions");
        }
        self.persist();
        Ok(added)
    }

    /// Pops the oldest pending mention.
    pub fn dequeue_oldest(&mut self) -> Option<Mention> {
        self.pending.pop_back()
    }

    /// Records that processing of mention `id` has started.
    ///
    /// Written before the mention is handled, so a crash while handling it
    /// skips the mention on restart instead of handling it twice.
    pub fn mark_initiated(&mut self, id: &str) {
        self.watermark = Some(id.to_string());
        if let Err(e) = self.store.save_watermark(id) {
            error!("Failed to persist watermark {}: {}", id, e);
        }
    }

    /// Writes the current queue snapshot. Failures are logged, not returned:
    /// the in-memory queue stays authoritative and the next write retries.
    pub fn persist(&self) {
        let snapshot: Vec<Mention> = self.pending.iter().cloned().collect();
        if let Err(e) = self.store.save_queue(&snapshot) {
            error!("Failed to persist mention queue: {}", e);
        }
    }
}
