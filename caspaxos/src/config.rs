//! Configuration types for a CASPaxos participant.

use crate::error::{CasPaxosError, Result};
use crate::network::quorum_for;
use std::time::Duration;

/// Default timeout applied to each phase of a round.
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings used by the convenience operations of a participant
/// ([`update`](crate::Participant::update), [`read`](crate::Participant::read),
/// [`delete`](crate::Participant::delete)).
///
/// [`round`](crate::Participant::round) takes quorum and timeout explicitly
/// and ignores this configuration.
#[derive(Clone, Debug)]
pub struct ParticipantConfig {
    /// Affirmative answers required per phase.
    ///
    /// `None` uses a majority of the network's nodes.
    pub quorum: Option<usize>,

    /// Timeout for each of the Prepare and Accept phases.
    pub round_timeout: Duration,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            quorum: None,
            round_timeout: DEFAULT_ROUND_TIMEOUT,
        }
    }
}

impl ParticipantConfig {
    /// Set a fixed quorum.
    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = Some(quorum);
        self
    }

    /// Set the per-phase timeout.
    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = timeout;
        self
    }

    /// Quorum to use for a cluster of `cluster_size` nodes.
    pub fn quorum_size(&self, cluster_size: usize) -> usize {
        self.quorum.unwrap_or_else(|| quorum_for(cluster_size))
    }

    /// Validate the configuration against the cluster size.
    ///
    /// # Checks
    ///
    /// - The cluster has at least one node
    /// - The quorum is a majority and does not exceed the cluster size
    /// - The round timeout is non-zero
    pub fn validate(&self, cluster_size: usize) -> Result<()> {
        if cluster_size == 0 {
            return Err(CasPaxosError::Config(
                "cluster must have at least one node".into(),
            ));
        }

        let quorum = self.quorum_size(cluster_size);
        if quorum > cluster_size {
            return Err(CasPaxosError::Config(format!(
                "quorum {quorum} exceeds cluster size {cluster_size}"
            )));
        }

        if quorum < quorum_for(cluster_size) {
            return Err(CasPaxosError::Config(format!(
                "quorum {quorum} is not a majority of {cluster_size} nodes"
            )));
        }

        if self.round_timeout.is_zero() {
            return Err(CasPaxosError::Config(
                "round timeout must be non-zero".into(),
            ));
        }

        Ok(())
    }
}
