//! Single-decree CASPaxos for evento.
//!
//! This crate replicates versioned key/value entries with CASPaxos: every
//! write is a compare-and-set round over one key, driven by any node, with no
//! leader and no log.
//!
//! - **Linearizable per key**: successful rounds on a key form a chain of
//!   strictly increasing ballots
//! - **Leaderless**: any node may start a round at any time
//! - **Fault Tolerance**: survive f failures with 2f+1 nodes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Application                │
//! │                    │                     │
//! │                    ▼                     │
//! │            ┌───────────────┐             │
//! │            │  Participant  │◄──────┐     │
//! │            └───────┬───────┘       │     │
//! │                    │               │     │
//! │          ┌─────────┴─────────┐     │     │
//! │          ▼                   ▼     │     │
//! │     ┌─────────┐        ┌─────────┐ │     │
//! │     │ Storage │        │ Network │─┘     │
//! │     └─────────┘        └─────────┘       │
//! │                             │            │
//! │                             ▼            │
//! │                        ┌─────────┐       │
//! │                        │  Other  │       │
//! │                        │  Nodes  │       │
//! │                        └─────────┘       │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Round Phases
//!
//! 1. **Prepare**: Reserve a fresh ballot on a quorum and learn the latest
//!    entry each node holds for the key
//! 2. **Accept**: Apply the transform to the freshest entry and have a quorum
//!    store the result under the new ballot
//!
//! # Quick Start
//!
//! ```ignore
//! use caspaxos::{ChannelNetwork, MemoryStorage, Participant};
//! use std::sync::Arc;
//!
//! let networks = ChannelNetwork::<u64>::create_cluster(3);
//! let mut participants = Vec::new();
//!
//! for network in networks {
//!     let participant = Arc::new(
//!         Participant::new(
//!             network.local_node(),
//!             Arc::new(network.clone()),
//!             Arc::new(MemoryStorage::new()),
//!         )
//!         .await?,
//!     );
//!     network.serve(participant.clone());
//!     participants.push(participant);
//! }
//!
//! let result = participants[0]
//!     .update("counter", |v| Some(v.map_or(1, |v| v + 1)))
//!     .await?;
//! assert_eq!(result.value(), Some(&1));
//! ```

pub mod ballot;
pub mod config;
pub mod entry;
pub mod error;
pub mod message;
pub mod metrics;
pub mod network;
pub mod participant;
pub mod storage;
pub mod tracing_ext;

// Re-export main types at crate root
pub use ballot::Ballot;
pub use config::ParticipantConfig;
pub use entry::VersionedEntry;
pub use error::{CasPaxosError, Result};
pub use message::{Accept, Prepare, Request, RoundOutcome, RoundResult, RoundStepResult};
pub use network::{ChannelNetwork, LinkState, Network, Node, NodeId, Phase};
pub use participant::Participant;
pub use storage::{MemoryStorage, Storage};
