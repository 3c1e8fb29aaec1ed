//! Versioned key/value entries.

use crate::ballot::Ballot;
use serde::{Deserialize, Serialize};

/// A key/value pair stamped with the ballot that last wrote it.
///
/// Entries are exchanged between nodes and persisted by storage. Once stored
/// under a ballot an entry is never mutated: a newer write produces a new
/// entry. A `None` value is a tombstone (or a key that was never written).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedEntry<V> {
    /// Key this entry belongs to
    pub key: String,
    /// Ballot of the round that wrote the entry
    pub ballot: Ballot,
    /// Current value, `None` for a tombstone
    pub value: Option<V>,
}

impl<V> VersionedEntry<V> {
    /// Create a new entry
    pub fn new(key: impl Into<String>, ballot: Ballot, value: Option<V>) -> Self {
        Self {
            key: key.into(),
            ballot,
            value,
        }
    }

    /// The placeholder returned for a key that has never been stored.
    pub fn absent(key: impl Into<String>) -> Self {
        Self::new(key, Ballot::MIN, None)
    }

    /// Whether the entry carries no value.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

impl<V: std::fmt::Debug> std::fmt::Display for VersionedEntry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}={:?}", self.key, self.ballot, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_entry() {
        let entry = VersionedEntry::<i64>::absent("missing");

        assert_eq!(entry.key, "missing");
        assert_eq!(entry.ballot, Ballot::MIN);
        assert!(entry.is_tombstone());
    }

    #[test]
    fn test_display() {
        let entry = VersionedEntry::new("counter", Ballot::new(1, 2, 3), Some(7));
        assert_eq!(entry.to_string(), "counter@1:2:3=Some(7)");
    }

    #[test]
    fn test_serde_json() {
        let entry = VersionedEntry::new("k", Ballot::new(2, 0, 1), Some("v".to_owned()));
        let json = serde_json::to_string(&entry).unwrap();
        let back: VersionedEntry<String> = serde_json::from_str(&json).unwrap();

        assert_eq!(back, entry);
    }
}
