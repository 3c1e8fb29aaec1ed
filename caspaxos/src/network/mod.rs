//! Network layer for inter-node communication.
//!
//! The engine only depends on the [`Network`] trait. [`ChannelNetwork`] is an
//! in-process implementation with per-link fault injection.

pub mod channel;
pub mod traits;

pub use channel::{ChannelNetwork, LinkState, Phase};
pub use traits::{quorum_for, Network, Node, NodeId, StepPredicate};
