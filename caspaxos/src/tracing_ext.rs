//! Tracing span helpers for CASPaxos.
//!
//! Rounds and inbound handlers are instrumented with `tracing` spans. Any
//! subscriber installed by the application picks them up.
//!
//! # Spans
//!
//! - `caspaxos.round` - Full round on the proposing node
//! - `caspaxos.prepare` - Prepare phase
//! - `caspaxos.accept` - Accept phase
//! - `caspaxos.handle` - Inbound message handled by an acceptor
//! - `caspaxos.network.broadcast` - Message broadcast

use crate::ballot::Ballot;
use crate::network::NodeId;
use tracing::{debug_span, info_span, Span};

/// Span names used by CASPaxos.
pub mod span_names {
    /// Full round.
    pub const ROUND: &str = "caspaxos.round";
    /// Prepare phase.
    pub const PREPARE: &str = "caspaxos.prepare";
    /// Accept phase.
    pub const ACCEPT: &str = "caspaxos.accept";
    /// Inbound message handling.
    pub const HANDLE: &str = "caspaxos.handle";
    /// Message broadcast.
    pub const BROADCAST: &str = "caspaxos.network.broadcast";
}

/// Create a span for a full round.
pub fn round_span(node_id: NodeId, key: &str) -> Span {
    info_span!(
        target: "caspaxos",
        "caspaxos.round",
        node_id = %node_id,
        key = %key,
        ballot = tracing::field::Empty,
        outcome = tracing::field::Empty,
        otel.name = span_names::ROUND,
    )
}

/// Create a span for the Prepare phase.
pub fn prepare_span(ballot: &Ballot, quorum: usize) -> Span {
    debug_span!(
        target: "caspaxos",
        "caspaxos.prepare",
        ballot = %ballot,
        quorum = %quorum,
        otel.name = span_names::PREPARE,
    )
}

/// Create a span for the Accept phase.
pub fn accept_span(ballot: &Ballot, quorum: usize) -> Span {
    debug_span!(
        target: "caspaxos",
        "caspaxos.accept",
        ballot = %ballot,
        quorum = %quorum,
        otel.name = span_names::ACCEPT,
    )
}

/// Create a span for handling an inbound message.
pub fn handle_span(node_id: NodeId, message_type: &str) -> Span {
    debug_span!(
        target: "caspaxos",
        "caspaxos.handle",
        node_id = %node_id,
        message_type = %message_type,
        otel.name = span_names::HANDLE,
    )
}

/// Create a span for broadcasting a message.
pub fn broadcast_span(message_type: &str, node_count: usize) -> Span {
    debug_span!(
        target: "caspaxos",
        "caspaxos.network.broadcast",
        message_type = %message_type,
        node_count = %node_count,
        otel.name = span_names::BROADCAST,
    )
}

/// Record the ballot of the round on the current span.
pub fn record_ballot(ballot: &Ballot) {
    Span::current().record("ballot", tracing::field::display(ballot));
}

/// Record the outcome of the round on the current span.
pub fn record_outcome(outcome: &str) {
    Span::current().record("outcome", outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_span() {
        // Spans work even without a subscriber (they're just no-ops)
        let span = round_span(1, "counter");
        let _enter = span.enter();
        record_ballot(&Ballot::new(0, 1, 1));
        record_outcome("ok");
    }

    #[test]
    fn test_phase_spans() {
        let ballot = Ballot::new(2, 0, 3);
        let _prepare = prepare_span(&ballot, 2);
        let _accept = accept_span(&ballot, 2);
    }

    #[test]
    fn test_handle_span() {
        let _span = handle_span(1, "Prepare");
    }

    #[test]
    fn test_broadcast_span() {
        let _span = broadcast_span("Accept", 5);
    }

    #[test]
    fn test_span_names() {
        assert_eq!(span_names::ROUND, "caspaxos.round");
        assert_eq!(span_names::PREPARE, "caspaxos.prepare");
        assert_eq!(span_names::ACCEPT, "caspaxos.accept");
    }
}
