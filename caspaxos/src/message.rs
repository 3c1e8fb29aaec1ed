//! Messages exchanged between participants and the results of a round.
//!
//! These types are transport-agnostic: the network implementation decides how
//! (and whether) to encode them on the wire. All of them derive serde traits.

use crate::ballot::Ballot;
use crate::entry::VersionedEntry;
use serde::{Deserialize, Serialize};

/// Phase 1: ask every node to promise `ballot` for `key`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prepare {
    pub ballot: Ballot,
    pub key: String,
}

impl Prepare {
    pub fn new(ballot: Ballot, key: impl Into<String>) -> Self {
        Self {
            ballot,
            key: key.into(),
        }
    }
}

/// Phase 2: ask every node to store `entry`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accept<V> {
    pub entry: VersionedEntry<V>,
}

impl<V> Accept<V> {
    pub fn new(entry: VersionedEntry<V>) -> Self {
        Self { entry }
    }
}

/// Inbound message as routed to a participant by the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request<V> {
    Prepare(Prepare),
    Accept(Accept<V>),
}

impl<V> Request<V> {
    /// Key the message is about.
    pub fn key(&self) -> &str {
        match self {
            Request::Prepare(prepare) => &prepare.key,
            Request::Accept(accept) => &accept.entry.key,
        }
    }

    /// Ballot the message is about.
    pub fn ballot(&self) -> Ballot {
        match self {
            Request::Prepare(prepare) => prepare.ballot,
            Request::Accept(accept) => accept.entry.ballot,
        }
    }

    /// Get the message type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Request::Prepare(_) => "Prepare",
            Request::Accept(_) => "Accept",
        }
    }
}

/// One node's answer to a single Prepare or Accept.
///
/// `ok == false` is an explicit rejection; the entry, when present, is the
/// value the rejecting node currently holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStepResult<V> {
    pub ok: bool,
    pub entry: Option<VersionedEntry<V>>,
}

impl<V> RoundStepResult<V> {
    pub fn new(ok: bool, entry: Option<VersionedEntry<V>>) -> Self {
        Self { ok, entry }
    }

    /// Affirmative answer carrying `entry`.
    pub fn accepted(entry: VersionedEntry<V>) -> Self {
        Self::new(true, Some(entry))
    }

    /// Explicit rejection, optionally carrying the competing entry.
    pub fn rejected(entry: Option<VersionedEntry<V>>) -> Self {
        Self::new(false, entry)
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Ballot of the carried entry, if any.
    pub fn ballot(&self) -> Option<Ballot> {
        self.entry.as_ref().map(|e| e.ballot)
    }
}

/// Terminal status of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Both phases reached quorum, the new entry is chosen
    Ok,
    /// At least one node explicitly rejected the round
    Conflict,
    /// Not enough answers and no explicit rejection
    Timeout,
}

impl RoundOutcome {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a full round.
///
/// On [`RoundOutcome::Ok`] the entry is the newly chosen value and
/// `responses` the number of affirmative accepts. On
/// [`RoundOutcome::Conflict`] the entry is the highest competing entry that
/// was observed (if any rejection carried one). On [`RoundOutcome::Timeout`]
/// there is no entry. For failed rounds `responses` counts every answer
/// collected in the failing phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult<V> {
    pub outcome: RoundOutcome,
    pub entry: Option<VersionedEntry<V>>,
    pub responses: usize,
}

impl<V> RoundResult<V> {
    pub fn new(outcome: RoundOutcome, entry: Option<VersionedEntry<V>>, responses: usize) -> Self {
        Self {
            outcome,
            entry,
            responses,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == RoundOutcome::Ok
    }

    pub fn is_conflict(&self) -> bool {
        self.outcome == RoundOutcome::Conflict
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome == RoundOutcome::Timeout
    }

    /// Value of the carried entry, if any.
    pub fn value(&self) -> Option<&V> {
        self.entry.as_ref().and_then(|e| e.value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors() {
        let prepare: Request<i64> = Request::Prepare(Prepare::new(Ballot::new(1, 2, 3), "a"));
        assert_eq!(prepare.key(), "a");
        assert_eq!(prepare.ballot(), Ballot::new(1, 2, 3));
        assert_eq!(prepare.type_name(), "Prepare");

        let accept = Request::Accept(Accept::new(VersionedEntry::new(
            "b",
            Ballot::new(4, 0, 0),
            Some(1),
        )));
        assert_eq!(accept.key(), "b");
        assert_eq!(accept.ballot(), Ballot::new(4, 0, 0));
        assert_eq!(accept.type_name(), "Accept");
    }

    #[test]
    fn test_step_result_ballot() {
        let rejected = RoundStepResult::<i64>::rejected(None);
        assert!(!rejected.is_ok());
        assert_eq!(rejected.ballot(), None);

        let entry = VersionedEntry::new("k", Ballot::new(1, 1, 1), Some(2));
        let accepted = RoundStepResult::accepted(entry);
        assert!(accepted.is_ok());
        assert_eq!(accepted.ballot(), Some(Ballot::new(1, 1, 1)));
    }

    #[test]
    fn test_round_result_value() {
        let result = RoundResult::new(
            RoundOutcome::Ok,
            Some(VersionedEntry::new("k", Ballot::new(1, 0, 1), Some(5))),
            2,
        );
        assert!(result.is_ok());
        assert_eq!(result.value(), Some(&5));

        let timeout = RoundResult::<i64>::new(RoundOutcome::Timeout, None, 1);
        assert!(timeout.is_timeout());
        assert_eq!(timeout.value(), None);
        assert_eq!(timeout.outcome.to_string(), "timeout");
    }

    #[test]
    fn test_request_serde_json() {
        let request: Request<u32> = Request::Accept(Accept::new(VersionedEntry::new(
            "k",
            Ballot::new(1, 1, 1),
            None,
        )));
        let json = serde_json::to_string(&request).unwrap();
        let back: Request<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
