use crate::types::{Message, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// A message together with its parsed timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub message: Message,
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn new(message: Message) -> Result<Self> {
        let published_at = message.published_at()?;
        Ok(Self { message, published_at })
    }

    pub fn id(&self) -> &str {
        &self.message.id
    }
}

/// Counts reported to the renderer after the feed changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub visible: usize,
    pub total: usize,
    /// Messages from the last batch that were new to the feed
    pub accepted: usize,
}

/// Merges incrementally delivered batches into one newest-first collection
/// and exposes a growable window over its head.
///
/// `visible` is always a prefix of `all`, so only its length is stored.
/// Messages are unique by id; re-delivered ids are dropped and the first
/// delivery is kept.
pub struct FeedAggregator {
    items: Vec<FeedItem>,
    seen_ids: HashSet<String>,
    visible_len: usize,
    window_size: usize,
}

impl FeedAggregator {
    pub fn new(window_size: usize) -> Self {
        Self {
            items: Vec::new(),
            seen_ids: HashSet::new(),
            visible_len: 0,
            window_size: window_size.max(1),
        }
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.seen_ids.clear();
        self.visible_len = 0;
        debug!("Feed reset");
    }

    /// Merge a batch and recompute the window as the first `window_size` items.
    ///
    /// A batch containing an unparseable timestamp is rejected whole and the
    /// feed is left untouched.
    pub fn ingest(&mut self, batch: Vec<Message>) -> Result<FeedSnapshot> {
        let parsed = batch
            .into_iter()
            .map(FeedItem::new)
            .collect::<Result<Vec<_>>>()?;

        let mut accepted = 0;
        for item in parsed {
            if self.seen_ids.insert(item.message.id.clone()) {
                self.items.push(item);
                accepted += 1;
            } else {
                debug!("Dropping duplicate message {}", item.id());
            }
        }

        // Stable: equal timestamps keep delivery order.
        self.items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        self.visible_len = self.items.len().min(self.window_size);

        debug!(
            "Ingested batch: {} accepted, {} visible of {}",
            accepted,
            self.visible_len,
            self.items.len()
        );

        Ok(self.snapshot(accepted))
    }

    /// Grow the window by up to `window_size` items; returns how many were added.
    pub fn load_more(&mut self) -> usize {
        let added = self.window_size.min(self.items.len() - self.visible_len);
        self.visible_len += added;
        added
    }

    pub fn all(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn visible(&self) -> &[FeedItem] {
        &self.items[..self.visible_len]
    }

    /// Owned copies of the visible messages, e.g. as a summarize payload.
    pub fn visible_messages(&self) -> Vec<Message> {
        self.visible().iter().map(|item| item.message.clone()).collect()
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn has_more(&self) -> bool {
        self.visible_len < self.items.len()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn snapshot(&self, accepted: usize) -> FeedSnapshot {
        FeedSnapshot {
            visible: self.visible_len,
            total: self.items.len(),
            accepted,
        }
    }
}

impl Default for FeedAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
