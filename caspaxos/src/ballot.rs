//! Ballot numbers for CASPaxos rounds.
//!
//! A ballot is an `(epoch, proposer, seq)` triple compared lexicographically.
//! Uncontended rounds bump `seq` (a *tiny* increment); after a conflict the
//! proposer bumps `epoch` (a *mighty* increment) to leapfrog whatever
//! competing proposal it observed.

use crate::error::{CasPaxosError, Result};
use crate::network::NodeId;
use serde::{Deserialize, Serialize};

/// Proposal number used to detect staleness and serialize competing rounds.
///
/// Field order matters: the derived `Ord` compares `epoch`, then `proposer`,
/// then `seq`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Ballot {
    /// Bumped after a conflict
    pub epoch: u32,
    /// Node that issued the ballot (tie-breaker between nodes)
    pub proposer: NodeId,
    /// Bumped on every uncontended round
    pub seq: u32,
}

impl Ballot {
    /// Sentinel that compares below every issued ballot.
    pub const MIN: Ballot = Ballot {
        epoch: 0,
        proposer: 0,
        seq: 0,
    };

    /// Create a new ballot
    pub fn new(epoch: u32, proposer: NodeId, seq: u32) -> Self {
        Self {
            epoch,
            proposer,
            seq,
        }
    }

    /// Create the initial ballot for a node
    pub fn initial(node: NodeId) -> Self {
        Self::new(0, node, 1)
    }

    /// Same epoch, next `seq`, owned by `node`.
    ///
    /// Falls back to [`Ballot::increment_mighty`] once `seq` is exhausted.
    pub fn increment_tiny(&self, node: NodeId) -> Result<Self> {
        match self.seq.checked_add(1) {
            Some(seq) => Ok(Self {
                epoch: self.epoch,
                proposer: node,
                seq,
            }),
            None => self.increment_mighty(node),
        }
    }

    /// Next epoch, `seq` reset to zero, owned by `node`.
    ///
    /// Fails once `epoch` reached `u32::MAX`, a wrapped epoch would go back in
    /// time.
    pub fn increment_mighty(&self, node: NodeId) -> Result<Self> {
        let epoch = self
            .epoch
            .checked_add(1)
            .ok_or(CasPaxosError::BallotExhausted(*self))?;

        Ok(Self {
            epoch,
            proposer: node,
            seq: 0,
        })
    }

    /// Create a ballot for `node` that is guaranteed to be higher than this one
    pub fn higher(&self, node: NodeId) -> Result<Self> {
        if node >= self.proposer {
            self.increment_tiny(node)
        } else {
            self.increment_mighty(node)
        }
    }

    /// Whether this is the [`Ballot::MIN`] sentinel.
    pub fn is_min(&self) -> bool {
        *self == Self::MIN
    }
}

impl std::fmt::Display for Ballot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.epoch, self.proposer, self.seq)
    }
}

impl std::str::FromStr for Ballot {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let mut next = |name: &str| {
            parts
                .next()
                .ok_or_else(|| format!("missing {name} in ballot `{s}`"))
        };

        let epoch = next("epoch")?.parse::<u32>().map_err(|e| e.to_string())?;
        let proposer = next("proposer")?
            .parse::<NodeId>()
            .map_err(|e| e.to_string())?;
        let seq = next("seq")?.parse::<u32>().map_err(|e| e.to_string())?;

        Ok(Ballot::new(epoch, proposer, seq))
    }
}
