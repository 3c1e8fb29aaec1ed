//! Error types for CASPaxos.
//!
//! Round outcomes (conflict, timeout) are values, see
//! [`RoundResult`](crate::RoundResult). These errors only cover faults raised
//! by the network or storage collaborators and bad configuration.

use crate::ballot::Ballot;
use crate::network::NodeId;
use thiserror::Error;

/// Errors that can occur while running or answering a round.
#[derive(Error, Debug)]
pub enum CasPaxosError {
    /// Reading or persisting an entry or promise failed
    #[error("storage failure: {0}")]
    Storage(String),

    /// The network could not deliver or collect a message
    #[error("network failure: {0}")]
    Transport(String),

    /// No route to the node
    #[error("node {0} is unreachable")]
    NodeUnreachable(NodeId),

    /// No ballot above this one can be issued
    #[error("ballot space exhausted after {0}")]
    BallotExhausted(Ballot),

    /// Quorum or timeout settings are unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CasPaxosError {
    /// Whether the same round may succeed once the network recovers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NodeUnreachable(_) | Self::Transport(_))
    }
}

/// Result type for CASPaxos operations
pub type Result<T> = std::result::Result<T, CasPaxosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CasPaxosError::NodeUnreachable(3);
        assert_eq!(err.to_string(), "node 3 is unreachable");

        let err = CasPaxosError::Storage("disk full".to_owned());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(CasPaxosError::NodeUnreachable(1).is_retryable());
        assert!(CasPaxosError::Transport("reset".to_string()).is_retryable());

        assert!(!CasPaxosError::Storage("io".to_string()).is_retryable());
        assert!(!CasPaxosError::Config("bad".to_string()).is_retryable());
        assert!(!CasPaxosError::BallotExhausted(Ballot::new(u32::MAX, 0, u32::MAX)).is_retryable());
    }

    #[test]
    fn test_from_anyhow() {
        let err: CasPaxosError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, CasPaxosError::Internal(_)));
    }
}
