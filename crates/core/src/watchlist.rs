//! The user's list of rated, watched movies.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    models::{mean, WatchSummary, WatchedEntry, MAX_USER_RATING},
    store::{PersistentList, SlotStorage},
};

/// Errors raised by watch-list operations.
#[derive(Debug, Error)]
pub enum WatchlistError {
    /// An entry with this identifier is already on the list.
    #[error("{0} is already on the watch-list")]
    AlreadyWatched(String),

    /// User ratings run from 1 to 10.
    #[error("rating {0} is outside 1..={}", MAX_USER_RATING)]
    InvalidRating(u8),

    /// The change was applied in memory but could not be written.
    #[error("watch-list changed but could not be saved: {0:#}")]
    Persist(anyhow::Error),
}

/// In-memory watch-list mirrored into a storage slot on every change.
pub struct Watchlist {
    list: PersistentList<WatchedEntry>,
}

impl Watchlist {
    /// Load the watch-list saved in `slot`, or start empty.
    pub fn load(storage: Arc<dyn SlotStorage>, slot: impl Into<String>) -> Self {
        let list = PersistentList::load(storage, slot);
        info!(slot = list.slot(), entries = list.items().len(), "Watch-list loaded");
        Self { list }
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[WatchedEntry] {
        self.list.items()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.list.items().len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.list.items().is_empty()
    }

    /// Append `entry` unless its identifier is already present or its user
    /// rating is missing or outside `1..=MAX_USER_RATING`.
    ///
    /// On a write failure the entry stays in memory and
    /// [`WatchlistError::Persist`] is returned.
    pub fn add(&mut self, entry: WatchedEntry) -> Result<(), WatchlistError> {
        match entry.user_rating {
            Some(rating) if (1..=MAX_USER_RATING).contains(&rating) => {}
            other => return Err(WatchlistError::InvalidRating(other.unwrap_or(0))),
        }
        if self.is_watched(&entry.id) {
            return Err(WatchlistError::AlreadyWatched(entry.id));
        }
        info!(id = %entry.id, title = %entry.title, rating = ?entry.user_rating, "Adding to watch-list");
        self.list.push(entry).map_err(persist_failed)
    }

    /// Remove the entry for `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, WatchlistError> {
        let removed = self
            .list
            .retain(|entry| entry.id != id)
            .map_err(persist_failed)?;
        if removed > 0 {
            info!(id, "Removed from watch-list");
        }
        Ok(removed > 0)
    }

    /// Whether `id` is on the list.
    pub fn is_watched(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Entry for `id`, if present.
    pub fn get(&self, id: &str) -> Option<&WatchedEntry> {
        self.list.items().iter().find(|entry| entry.id == id)
    }

    /// User rating recorded for `id`.
    pub fn rating_for(&self, id: &str) -> Option<u8> {
        self.get(id).and_then(|entry| entry.user_rating)
    }

    /// Means over the list; every figure is `0` when the list is empty.
    ///
    /// Entries without a value for a field do not count towards that field.
    pub fn summary(&self) -> WatchSummary {
        let entries = self.list.items();
        WatchSummary {
            count: entries.len(),
            avg_external_rating: mean(entries.iter().filter_map(|e| e.external_rating)),
            avg_user_rating: mean(
                entries
                    .iter()
                    .filter_map(|e| e.user_rating)
                    .map(f64::from),
            ),
            avg_runtime: mean(entries.iter().filter_map(|e| e.runtime)),
        }
    }
}

fn persist_failed(err: anyhow::Error) -> WatchlistError {
    warn!(?err, "Watch-list write failed");
    WatchlistError::Persist(err)
}
