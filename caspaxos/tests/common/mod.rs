#![allow(dead_code)]

use caspaxos::{ChannelNetwork, LinkState, MemoryStorage, Participant, Phase, Storage};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// In-process cluster of `u64` participants connected by channels.
pub struct Cluster {
    pub networks: Vec<ChannelNetwork<u64>>,
    pub storages: Vec<MemoryStorage<u64>>,
    pub participants: Vec<Arc<Participant<u64>>>,
    servers: Vec<JoinHandle<()>>,
}

impl Cluster {
    pub async fn new(node_count: usize) -> Self {
        let networks = ChannelNetwork::<u64>::create_cluster(node_count);
        let mut storages = Vec::with_capacity(node_count);
        let mut participants = Vec::with_capacity(node_count);
        let mut servers = Vec::with_capacity(node_count);

        for network in &networks {
            let storage = MemoryStorage::new();
            let participant = Arc::new(
                Participant::new(
                    network.local_node(),
                    Arc::new(network.clone()),
                    Arc::new(storage.clone()),
                )
                .await
                .unwrap(),
            );

            servers.push(network.serve(participant.clone()));
            storages.push(storage);
            participants.push(participant);
        }

        Self {
            networks,
            storages,
            participants,
            servers,
        }
    }

    pub fn node(&self, id: usize) -> Arc<Participant<u64>> {
        self.participants[id].clone()
    }

    pub fn set_link_state(&self, node: u16, phase: Phase, state: LinkState) {
        self.networks[0].set_link_state(node, phase, state);
    }

    /// Rebuild node `id` on top of its existing storage.
    pub async fn restart(&mut self, id: usize) {
        self.servers[id].abort();

        let network = self.networks[id].clone();
        let participant = Arc::new(
            Participant::new(
                network.local_node(),
                Arc::new(network.clone()),
                Arc::new(self.storages[id].clone()),
            )
            .await
            .unwrap(),
        );

        self.servers[id] = network.serve(participant.clone());
        self.participants[id] = participant;
    }

    /// Number of nodes whose storage holds exactly `entry`.
    pub async fn stored_on(&self, entry: &caspaxos::VersionedEntry<u64>) -> usize {
        let mut count = 0;

        for storage in &self.storages {
            if &storage.get(&entry.key).await.unwrap() == entry {
                count += 1;
            }
        }

        count
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for server in &self.servers {
            server.abort();
        }
    }
}

pub fn increment(value: Option<u64>) -> Option<u64> {
    Some(value.map_or(1, |v| v + 1))
}

/// Run `transform` on `key` until a round commits.
///
/// Rounds from different nodes may conflict on their first attempt, a failed
/// round leaves the participant with a higher ballot for the next one.
pub async fn until_ok<F>(
    node: &Participant<u64>,
    key: &str,
    transform: F,
) -> caspaxos::RoundResult<u64>
where
    F: Fn(Option<u64>) -> Option<u64> + Send + Sync,
{
    for _ in 0..10 {
        let result = node.update(key, &transform).await.unwrap();
        if result.is_ok() {
            return result;
        }
    }

    panic!("no round on {key} committed after 10 attempts");
}
