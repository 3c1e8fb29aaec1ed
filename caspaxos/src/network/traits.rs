//! Network abstraction used by a participant to reach every node.

use crate::error::Result;
use crate::message::{Accept, Prepare, RoundStepResult};
use async_trait::async_trait;
use std::time::Duration;

/// Node identifier type.
pub type NodeId = u16;

/// A cluster member.
pub trait Node {
    /// Stable identifier of this node for the lifetime of the process.
    fn node_id(&self) -> NodeId;
}

impl Node for NodeId {
    fn node_id(&self) -> NodeId {
        *self
    }
}

/// Predicate deciding whether a single answer counts towards the quorum.
pub type StepPredicate<V> = dyn Fn(&RoundStepResult<V>) -> bool + Send + Sync;

/// Transport abstraction for broadcasting round messages.
///
/// Implementations deliver every message to the destination participant's
/// [`on_prepare`](crate::Participant::on_prepare) or
/// [`on_accept`](crate::Participant::on_accept) (the local node included) and
/// collect the answers. A call must return as soon as `min_responses`
/// answers satisfying `is_good` have arrived, once the answers still
/// outstanding can no longer reach `min_responses`, or when `timeout`
/// elapses, whichever happens first. Whatever was collected is returned;
/// unreachable nodes simply contribute nothing.
#[async_trait]
pub trait Network<V>: Send + Sync + 'static
where
    V: Send + Sync + 'static,
{
    /// All nodes in the cluster, regardless of whether they are reachable.
    fn all_nodes(&self) -> Vec<NodeId>;

    /// Broadcast a Prepare and collect the answers.
    async fn send_prepare(
        &self,
        prepare: &Prepare,
        min_responses: usize,
        is_good: &StepPredicate<V>,
        timeout: Duration,
    ) -> Result<Vec<RoundStepResult<V>>>;

    /// Broadcast an Accept and collect the answers.
    async fn send_accept(
        &self,
        accept: &Accept<V>,
        min_responses: usize,
        is_good: &StepPredicate<V>,
        timeout: Duration,
    ) -> Result<Vec<RoundStepResult<V>>>;

    /// Get the total number of nodes in the cluster.
    fn cluster_size(&self) -> usize {
        self.all_nodes().len()
    }

    /// Get the required quorum size for consensus.
    ///
    /// For a cluster of size N, quorum is floor(N/2) + 1.
    fn quorum_size(&self) -> usize {
        quorum_for(self.cluster_size())
    }
}

/// Majority quorum for a cluster of `cluster_size` nodes.
pub fn quorum_for(cluster_size: usize) -> usize {
    cluster_size / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_sizes() {
        assert_eq!(quorum_for(1), 1);
        assert_eq!(quorum_for(2), 2);
        assert_eq!(quorum_for(3), 2);
        assert_eq!(quorum_for(4), 3);
        assert_eq!(quorum_for(5), 3);
        assert_eq!(quorum_for(7), 4);
    }

    #[test]
    fn test_node_id_is_node() {
        let id: NodeId = 42;
        assert_eq!(id.node_id(), 42);
    }
}
