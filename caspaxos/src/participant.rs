//! The CASPaxos engine.
//!
//! A [`Participant`] plays both roles of the protocol:
//!
//! - **Proposer**: [`Participant::round`] runs Prepare then Accept for one key
//!   and applies a transform to the freshest value a quorum agrees on.
//! - **Acceptor**: [`Participant::on_prepare`] and [`Participant::on_accept`]
//!   answer the messages other proposers send.
//!
//! Rounds started on the same participant are serialized. Inbound handling
//! only takes the storage's per-key lock, so acceptors keep answering while a
//! local round waits for the network.

use crate::ballot::Ballot;
use crate::config::ParticipantConfig;
use crate::entry::VersionedEntry;
use crate::error::{CasPaxosError, Result};
use crate::message::{Accept, Prepare, Request, RoundOutcome, RoundResult, RoundStepResult};
use crate::metrics::{self, error_type, phase, Timer};
use crate::network::{Network, Node, NodeId};
use crate::storage::Storage;
use crate::tracing_ext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::Instrument;

/// A node taking part in CASPaxos rounds.
pub struct Participant<V> {
    node_id: NodeId,
    network: Arc<dyn Network<V>>,
    storage: Arc<dyn Storage<V>>,
    config: ParticipantConfig,
    /// Last ballot issued. Held for the whole duration of a round.
    current_ballot: Mutex<Ballot>,
}

impl<V> Participant<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a participant with the default configuration.
    ///
    /// The first ballot is derived from the highest ballot found in
    /// `storage`, so a restarted node never reuses a ballot.
    pub async fn new(
        node: impl Node,
        network: Arc<dyn Network<V>>,
        storage: Arc<dyn Storage<V>>,
    ) -> Result<Self> {
        Self::with_config(node, network, storage, ParticipantConfig::default()).await
    }

    /// Create a participant with an explicit configuration.
    pub async fn with_config(
        node: impl Node,
        network: Arc<dyn Network<V>>,
        storage: Arc<dyn Storage<V>>,
        config: ParticipantConfig,
    ) -> Result<Self> {
        config.validate(network.cluster_size())?;

        let node_id = node.node_id();
        let max_ballot = storage.get_max_ballot().await?;
        let current_ballot = max_ballot.increment_tiny(node_id)?;

        tracing::debug!(
            "participant {} starting at ballot {} (stored max {})",
            node_id,
            current_ballot,
            max_ballot
        );

        Ok(Self {
            node_id,
            network,
            storage,
            config,
            current_ballot: Mutex::new(current_ballot),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn config(&self) -> &ParticipantConfig {
        &self.config
    }

    /// Snapshot of the last issued ballot.
    ///
    /// Waits for a running round to finish.
    pub async fn current_ballot(&self) -> Ballot {
        *self.current_ballot.lock().await
    }

    /// Run one round on `key`.
    ///
    /// `transform` receives the value of the highest-ballot entry reported by
    /// the Prepare quorum (`None` when absent or deleted) and returns the value
    /// to write. `quorum` affirmative answers are required in each phase, each
    /// phase waiting at most `timeout`.
    ///
    /// Conflicts and timeouts are reported through [`RoundResult`]. Errors are
    /// only returned for a zero quorum or when a collaborator fails.
    pub async fn round<F>(
        &self,
        key: &str,
        transform: F,
        quorum: usize,
        timeout: Duration,
    ) -> Result<RoundResult<V>>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        if quorum == 0 {
            return Err(CasPaxosError::Config("quorum must be at least 1".into()));
        }

        let span = tracing_ext::round_span(self.node_id, key);
        let timer = Timer::round();

        let result = self
            .run_round(key, transform, quorum, timeout)
            .instrument(span)
            .await;

        timer.stop();

        match &result {
            Ok(result) => metrics::record_round(result.outcome),
            Err(e) => metrics::record_error(error_label(e)),
        }

        result
    }

    async fn run_round<F>(
        &self,
        key: &str,
        transform: F,
        quorum: usize,
        timeout: Duration,
    ) -> Result<RoundResult<V>>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        let mut current_ballot = self.current_ballot.lock().await;
        *current_ballot = current_ballot.increment_tiny(self.node_id)?;
        let ballot = *current_ballot;
        tracing_ext::record_ballot(&ballot);

        // Phase 1: Prepare
        let prepare = Prepare::new(ballot, key);
        let responses = {
            let _timer = Timer::phase(phase::PREPARE);
            self.network
                .send_prepare(&prepare, quorum, &is_ok::<V>, timeout)
                .instrument(tracing_ext::prepare_span(&ballot, quorum))
                .await?
        };

        let granted: Vec<_> = responses.iter().filter(|r| r.ok).collect();
        tracing::debug!(
            "prepare {} for {}: {}/{} granted, quorum {}",
            ballot,
            key,
            granted.len(),
            responses.len(),
            quorum
        );

        if granted.len() < quorum {
            *current_ballot = current_ballot.increment_mighty(self.node_id)?;
            return Ok(self.fail(key, ballot, "prepare", responses));
        }

        // The freshest entry among the granted answers is the only safe basis
        let basis = granted
            .into_iter()
            .filter_map(|r| r.entry.as_ref())
            .max_by_key(|e| e.ballot)
            .cloned()
            .unwrap_or_else(|| VersionedEntry::absent(key));

        let entry = VersionedEntry::new(key, ballot, transform(basis.value));

        // Phase 2: Accept
        let accept = Accept::new(entry);
        let responses = {
            let _timer = Timer::phase(phase::ACCEPT);
            self.network
                .send_accept(&accept, quorum, &is_ok::<V>, timeout)
                .instrument(tracing_ext::accept_span(&ballot, quorum))
                .await?
        };

        let accepted = responses.iter().filter(|r| r.ok).count();
        tracing::debug!(
            "accept {} for {}: {}/{} accepted, quorum {}",
            ballot,
            key,
            accepted,
            responses.len(),
            quorum
        );

        if accepted < quorum {
            *current_ballot = current_ballot.increment_mighty(self.node_id)?;
            return Ok(self.fail(key, ballot, "accept", responses));
        }

        tracing_ext::record_outcome(RoundOutcome::Ok.as_str());

        Ok(RoundResult::new(
            RoundOutcome::Ok,
            Some(accept.entry),
            accepted,
        ))
    }

    fn fail(
        &self,
        key: &str,
        ballot: Ballot,
        phase: &str,
        responses: Vec<RoundStepResult<V>>,
    ) -> RoundResult<V> {
        let result = classify(responses);

        tracing_ext::record_outcome(result.outcome.as_str());
        tracing::warn!(
            "round {} on {} failed in {} phase: {} ({} answers)",
            ballot,
            key,
            phase,
            result.outcome,
            result.responses
        );

        result
    }

    /// Answer a Prepare.
    ///
    /// Always replies with the stored entry. The reply is positive only if the
    /// ballot is strictly above the current promise, which it then replaces.
    pub async fn on_prepare(&self, prepare: Prepare) -> Result<RoundStepResult<V>> {
        let lock = self.storage.lock_for(&prepare.key);
        let _guard = lock.lock().await;

        let stored = self.storage.get(&prepare.key).await?;
        let promised = self.storage.promise(&prepare.key, prepare.ballot).await?;

        if !promised {
            tracing::debug!(
                "node {} rejects prepare {} for {}",
                self.node_id,
                prepare.ballot,
                prepare.key
            );
        }

        Ok(RoundStepResult::new(promised, Some(stored)))
    }

    /// Answer an Accept.
    ///
    /// The entry is stored when its ballot is not below the current promise.
    /// A rejection carries whatever is stored for the key.
    pub async fn on_accept(&self, accept: Accept<V>) -> Result<RoundStepResult<V>> {
        let entry = accept.entry;
        let lock = self.storage.lock_for(&entry.key);
        let _guard = lock.lock().await;

        let promise = self.storage.get_promise(&entry.key).await?;

        if entry.ballot < promise {
            tracing::debug!(
                "node {} rejects accept {} for {}, promised {}",
                self.node_id,
                entry.ballot,
                entry.key,
                promise
            );

            let stored = self.storage.poll(&entry.key).await?;
            return Ok(RoundStepResult::rejected(stored));
        }

        // Keep the promise at or above every stored ballot
        if entry.ballot > promise {
            self.storage.promise(&entry.key, entry.ballot).await?;
        }

        self.storage.store(&entry).await?;

        Ok(RoundStepResult::accepted(entry))
    }

    /// Dispatch an inbound request to its handler.
    pub async fn handle(&self, request: Request<V>) -> Result<RoundStepResult<V>> {
        let result = match request {
            Request::Prepare(prepare) => self.on_prepare(prepare).await,
            Request::Accept(accept) => self.on_accept(accept).await,
        };

        if let Err(e) = &result {
            metrics::record_error(error_label(e));
        }

        result
    }

    /// Run a round with the configured quorum and timeout.
    pub async fn update<F>(&self, key: &str, transform: F) -> Result<RoundResult<V>>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        let quorum = self.config.quorum_size(self.network.cluster_size());
        self.round(key, transform, quorum, self.config.round_timeout)
            .await
    }

    /// Read the value of `key` through a full round.
    ///
    /// The value is written back unchanged under a new ballot.
    pub async fn read(&self, key: &str) -> Result<RoundResult<V>> {
        self.update(key, |value| value).await
    }

    /// Replace the value of `key` with a tombstone.
    pub async fn delete(&self, key: &str) -> Result<RoundResult<V>> {
        self.update(key, |_| None).await
    }
}

fn is_ok<V>(result: &RoundStepResult<V>) -> bool {
    result.ok
}

/// Outcome of a failed phase.
///
/// Any explicit rejection makes it a conflict carrying the freshest entry
/// reported by the rejecting nodes. Otherwise too few nodes answered.
fn classify<V>(responses: Vec<RoundStepResult<V>>) -> RoundResult<V> {
    let count = responses.len();
    let mut rejected = false;
    let mut freshest: Option<VersionedEntry<V>> = None;

    for response in responses.into_iter().filter(|r| !r.ok) {
        rejected = true;

        if let Some(entry) = response.entry {
            if freshest.as_ref().map_or(true, |f| entry.ballot > f.ballot) {
                freshest = Some(entry);
            }
        }
    }

    if rejected {
        RoundResult::new(RoundOutcome::Conflict, freshest, count)
    } else {
        RoundResult::new(RoundOutcome::Timeout, None, count)
    }
}

fn error_label(error: &CasPaxosError) -> &'static str {
    match error {
        CasPaxosError::Storage(_) => error_type::STORAGE,
        CasPaxosError::Transport(_) | CasPaxosError::NodeUnreachable(_) => error_type::TRANSPORT,
        CasPaxosError::Config(_) => error_type::CONFIG,
        CasPaxosError::BallotExhausted(_) | CasPaxosError::Internal(_) => error_type::INTERNAL,
    }
}
