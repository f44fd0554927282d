//! Named-slot persistence for small JSON lists.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Key-value storage addressed by slot name.
pub trait SlotStorage: Send + Sync {
    /// Return the slot contents, or `None` if it was never written.
    fn read(&self, slot: &str) -> Result<Option<String>>;

    /// Replace the slot contents entirely.
    fn write(&self, slot: &str, contents: &str) -> Result<()>;
}

/// Stores each slot as `<root>/<slot>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File backing `slot`.
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_component(slot)))
    }
}

impl SlotStorage for FileStorage {
    fn read(&self, slot: &str) -> Result<Option<String>> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn write(&self, slot: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.slot_path(slot);
        let mut tmp = NamedTempFile::new_in(&self.root)
            .with_context(|| format!("failed to stage {}", path.display()))?;
        tmp.write_all(contents.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tmp.persist(&path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// In-process storage that counts writes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one slot.
    pub fn with_slot(slot: &str, contents: &str) -> Self {
        let storage = Self::default();
        storage
            .slots
            .lock()
            .insert(slot.to_string(), contents.to_string());
        storage
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents of `slot`.
    pub fn contents(&self, slot: &str) -> Option<String> {
        self.slots.lock().get(slot).cloned()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().get(slot).cloned())
    }

    fn write(&self, slot: &str, contents: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("storage slot {slot} is not writable"));
        }
        self.slots
            .lock()
            .insert(slot.to_string(), contents.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A list mirrored into one storage slot.
///
/// The initial value is read once; every change rewrites the whole slot.
pub struct PersistentList<T> {
    storage: Arc<dyn SlotStorage>,
    slot: String,
    items: Vec<T>,
}

impl<T> PersistentList<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Load the list stored in `slot`. Missing or unreadable data yields an empty list.
    pub fn load(storage: Arc<dyn SlotStorage>, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let items = match storage.read(&slot) {
            Ok(Some(content)) => match serde_json::from_str::<Vec<T>>(&content) {
                Ok(items) => items,
                Err(err) => {
                    warn!(slot = %slot, %err, "Discarding unparseable slot contents");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!(slot = %slot, "No saved slot; starting empty");
                Vec::new()
            }
            Err(err) => {
                warn!(slot = %slot, ?err, "Failed to read slot; starting empty");
                Vec::new()
            }
        };
        Self {
            storage,
            slot,
            items,
        }
    }

    /// Slot name this list is mirrored to.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Current items.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Append an item and write the list.
    pub fn push(&mut self, item: T) -> Result<()> {
        self.items.push(item);
        self.sync()
    }

    /// Keep only items matching `keep`; writes only when something was removed.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) -> Result<usize> {
        let before = self.items.len();
        self.items.retain(keep);
        let removed = before - self.items.len();
        if removed > 0 {
            self.sync()?;
        }
        Ok(removed)
    }

    /// Serialize the full list and overwrite the slot.
    pub fn sync(&self) -> Result<()> {
        let serialised =
            serde_json::to_string(&self.items).context("failed to serialize slot contents")?;
        self.storage
            .write(&self.slot, &serialised)
            .with_context(|| format!("failed to persist slot {}", self.slot))
    }
}

fn sanitize_component(input: &str) -> String {
    let result: String = input
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    if result.is_empty() {
        "slot".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_storage_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path().join("data"));
        assert_eq!(storage.read("watched")?, None);

        storage.write("watched", "[1,2]")?;
        assert!(storage.slot_path("watched").exists());
        assert_eq!(storage.read("watched")?.as_deref(), Some("[1,2]"));

        storage.write("watched", "[]")?;
        assert_eq!(storage.read("watched")?.as_deref(), Some("[]"));
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("../watched list!"), "watchedlist");
        assert_eq!(sanitize_component("///"), "slot");
    }

    #[test]
    fn corrupt_slot_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileStorage::new(dir.path());
        storage.write("watched", "{not json")?;

        let list: PersistentList<u32> = PersistentList::load(Arc::new(storage), "watched");
        assert!(list.items().is_empty());
        Ok(())
    }

    #[test]
    fn every_change_overwrites_slot() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let mut list: PersistentList<u32> = PersistentList::load(storage.clone(), "numbers");
        assert!(list.items().is_empty());
        assert_eq!(storage.writes(), 0);

        list.push(1)?;
        list.push(2)?;
        assert_eq!(storage.contents("numbers").as_deref(), Some("[1,2]"));

        assert_eq!(list.retain(|value| *value != 7)?, 0);
        assert_eq!(storage.writes(), 2);

        assert_eq!(list.retain(|value| *value != 1)?, 1);
        assert_eq!(storage.contents("numbers").as_deref(), Some("[2]"));
        assert_eq!(storage.writes(), 3);

        let reloaded: PersistentList<u32> = PersistentList::load(storage, "numbers");
        assert_eq!(reloaded.items(), &[2]);
        Ok(())
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let storage = Arc::new(MemoryStorage::new());
        let mut list: PersistentList<u32> = PersistentList::load(storage.clone(), "numbers");
        storage.set_fail_writes(true);
        assert!(list.push(5).is_err());
        assert_eq!(list.items(), &[5]);
        assert_eq!(storage.contents("numbers"), None);
    }
}
