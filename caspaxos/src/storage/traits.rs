//! Storage abstraction for entries and promises.

use crate::ballot::Ballot;
use crate::entry::VersionedEntry;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-key lock handed out by [`Storage::lock_for`].
pub type KeyLock = Arc<Mutex<()>>;

/// Durable storage for versioned entries and per-key promises.
///
/// Every read-modify-write of a key (`get`/`poll`, `get_promise`, `promise`,
/// `store`) must happen while holding that key's [`KeyLock`]. Implementations
/// may stripe or share locks between keys as long as a key always maps to the
/// same lock.
///
/// Implementations must guarantee that once `store` returns successfully the
/// entry survives crashes. Promises may be kept transiently.
#[async_trait]
pub trait Storage<V>: Send + Sync + 'static
where
    V: Send + Sync + 'static,
{
    /// Lock guarding `key`.
    fn lock_for(&self, key: &str) -> KeyLock;

    /// Highest ballot among the entries ever stored on this node.
    ///
    /// Returns [`Ballot::MIN`] for an empty store. Used to seed a participant
    /// so a restarted node never reissues a ballot.
    async fn get_max_ballot(&self) -> Result<Ballot>;

    /// Stored entry for `key`, `None` if it was never stored.
    async fn poll(&self, key: &str) -> Result<Option<VersionedEntry<V>>>;

    /// Stored entry for `key`, or a [`Ballot::MIN`] entry without value.
    async fn get(&self, key: &str) -> Result<VersionedEntry<V>> {
        Ok(self
            .poll(key)
            .await?
            .unwrap_or_else(|| VersionedEntry::absent(key)))
    }

    /// Current promise for `key`, [`Ballot::MIN`] when none was made.
    async fn get_promise(&self, key: &str) -> Result<Ballot>;

    /// Promise `ballot` for `key`.
    ///
    /// Succeeds only when `ballot` is strictly greater than the current
    /// promise, in which case it becomes the new promise.
    async fn promise(&self, key: &str, ballot: Ballot) -> Result<bool>;

    /// Persist `entry`, replacing whatever was stored for its key.
    async fn store(&self, entry: &VersionedEntry<V>) -> Result<()>;
}
