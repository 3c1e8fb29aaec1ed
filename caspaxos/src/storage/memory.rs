//! In-memory storage.
//!
//! This implementation does NOT survive process restarts. Clones share the
//! same state, which lets a test rebuild a participant on top of the storage
//! of a "restarted" node.

use crate::ballot::Ballot;
use crate::entry::VersionedEntry;
use crate::error::Result;
use crate::storage::traits::{KeyLock, Storage};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Inner<V> {
    entries: RwLock<HashMap<String, VersionedEntry<V>>>,
    promises: RwLock<HashMap<String, Ballot>>,
    locks: RwLock<HashMap<String, KeyLock>>,
    max_ballot: RwLock<Ballot>,
}

impl<V> Default for Inner<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::default(),
            promises: RwLock::default(),
            locks: RwLock::default(),
            max_ballot: RwLock::new(Ballot::MIN),
        }
    }
}

/// Storage keeping entries and promises in hash maps.
#[derive(Debug)]
pub struct MemoryStorage<V>(Arc<Inner<V>>);

impl<V> Clone for MemoryStorage<V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V> Default for MemoryStorage<V> {
    fn default() -> Self {
        Self(Arc::default())
    }
}

impl<V: Clone> MemoryStorage<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, tombstones included.
    pub fn len(&self) -> usize {
        self.0.entries.read().len()
    }

    /// Check if nothing was stored yet
    pub fn is_empty(&self) -> bool {
        self.0.entries.read().is_empty()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> Vec<VersionedEntry<V>> {
        self.0.entries.read().values().cloned().collect()
    }
}

#[async_trait]
impl<V> Storage<V> for MemoryStorage<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn lock_for(&self, key: &str) -> KeyLock {
        if let Some(lock) = self.0.locks.read().get(key) {
            return lock.clone();
        }

        self.0
            .locks
            .write()
            .entry(key.to_owned())
            .or_default()
            .clone()
    }

    async fn get_max_ballot(&self) -> Result<Ballot> {
        Ok(*self.0.max_ballot.read())
    }

    async fn poll(&self, key: &str) -> Result<Option<VersionedEntry<V>>> {
        Ok(self.0.entries.read().get(key).cloned())
    }

    async fn get_promise(&self, key: &str) -> Result<Ballot> {
        Ok(self
            .0
            .promises
            .read()
            .get(key)
            .copied()
            .unwrap_or(Ballot::MIN))
    }

    async fn promise(&self, key: &str, ballot: Ballot) -> Result<bool> {
        let mut promises = self.0.promises.write();
        let current = promises.entry(key.to_owned()).or_insert(Ballot::MIN);

        if ballot > *current {
            *current = ballot;
            return Ok(true);
        }

        Ok(false)
    }

    async fn store(&self, entry: &VersionedEntry<V>) -> Result<()> {
        self.0
            .entries
            .write()
            .insert(entry.key.to_owned(), entry.clone());

        let mut max_ballot = self.0.max_ballot.write();
        if entry.ballot > *max_ballot {
            *max_ballot = entry.ballot;
        }

        Ok(())
    }
}
