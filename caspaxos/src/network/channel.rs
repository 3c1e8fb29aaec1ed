//! In-memory channel-based network.
//!
//! This network uses Tokio channels instead of real connections, which makes
//! it suitable for tests and single-process clusters. Each link can be
//! switched to drop or reject messages per phase to simulate failures.

use crate::error::{CasPaxosError, Result};
use crate::message::{Accept, Prepare, Request, RoundStepResult};
use crate::metrics::{self, direction};
use crate::network::traits::{Network, NodeId, StepPredicate};
use crate::participant::Participant;
use crate::tracing_ext;
use async_trait::async_trait;
use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Type alias for message with response channel.
type MessageWithReply<V> = (Request<V>, oneshot::Sender<RoundStepResult<V>>);
/// Type alias for sender map.
type SenderMap<V> = Arc<HashMap<NodeId, mpsc::Sender<MessageWithReply<V>>>>;
/// Type alias for receiver.
type MessageReceiver<V> = Arc<Mutex<mpsc::Receiver<MessageWithReply<V>>>>;
/// Type alias for the shared fault table.
type FaultMap = Arc<RwLock<HashMap<(NodeId, Phase), LinkState>>>;

/// Protocol phase a link state applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Accept,
}

impl Phase {
    fn of<V>(request: &Request<V>) -> Self {
        match request {
            Request::Prepare(_) => Phase::Prepare,
            Request::Accept(_) => Phase::Accept,
        }
    }
}

/// How messages addressed to a node behave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    /// Delivered and answered normally
    #[default]
    Working,
    /// Never answered, the sender waits for its timeout
    Silent,
    /// Answered with an explicit rejection without being delivered
    Reject,
}

/// Channel network handle for one node of an in-process cluster.
pub struct ChannelNetwork<V> {
    local_id: NodeId,
    nodes: Vec<NodeId>,
    senders: SenderMap<V>,
    receiver: MessageReceiver<V>,
    faults: FaultMap,
}

impl<V> Clone for ChannelNetwork<V> {
    fn clone(&self) -> Self {
        Self {
            local_id: self.local_id,
            nodes: self.nodes.clone(),
            senders: self.senders.clone(),
            receiver: self.receiver.clone(),
            faults: self.faults.clone(),
        }
    }
}

impl<V> ChannelNetwork<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cluster of connected in-memory networks.
    ///
    /// Returns one handle per node, node ids are `0..node_count`. All
    /// handles share the same fault table.
    pub fn create_cluster(node_count: usize) -> Vec<Self> {
        let mut senders = HashMap::new();
        let mut receivers = Vec::with_capacity(node_count);

        for i in 0..node_count {
            let (tx, rx) = mpsc::channel(1024);
            senders.insert(i as NodeId, tx);
            receivers.push(rx);
        }

        let senders = Arc::new(senders);
        let faults = FaultMap::default();
        let nodes: Vec<NodeId> = (0..node_count).map(|i| i as NodeId).collect();

        receivers
            .into_iter()
            .enumerate()
            .map(|(i, rx)| Self {
                local_id: i as NodeId,
                nodes: nodes.clone(),
                senders: senders.clone(),
                receiver: Arc::new(Mutex::new(rx)),
                faults: faults.clone(),
            })
            .collect()
    }

    /// Identifier of the node owning this handle.
    pub fn local_node(&self) -> NodeId {
        self.local_id
    }

    /// Change how `node` treats messages of `phase`.
    pub fn set_link_state(&self, node: NodeId, phase: Phase, state: LinkState) {
        self.faults.write().insert((node, phase), state);
    }

    /// Restore every link to [`LinkState::Working`].
    pub fn set_all_working(&self) {
        self.faults.write().clear();
    }

    /// Current state of the link to `node` for `phase`.
    pub fn link_state(&self, node: NodeId, phase: Phase) -> LinkState {
        self.faults
            .read()
            .get(&(node, phase))
            .copied()
            .unwrap_or_default()
    }

    /// Receive the next incoming message.
    ///
    /// Returns the message and a channel to send the response.
    pub async fn recv(&self) -> Option<MessageWithReply<V>> {
        self.receiver.lock().await.recv().await
    }

    /// Route this node's inbound messages to `participant`.
    ///
    /// Every message is handled on its own task so different keys proceed
    /// concurrently. A handler error leaves the message unanswered.
    pub fn serve(&self, participant: Arc<Participant<V>>) -> JoinHandle<()> {
        let network = self.clone();

        tokio::spawn(async move {
            while let Some((request, reply_tx)) = network.recv().await {
                let participant = participant.clone();
                let span = tracing_ext::handle_span(network.local_id, request.type_name());

                tokio::spawn(
                    async move {
                        match participant.handle(request).await {
                            Ok(result) => {
                                let _ = reply_tx.send(result);
                            }
                            Err(e) => {
                                tracing::warn!("failed to handle message: {}", e);
                            }
                        }
                    }
                    .instrument(span),
                );
            }

            tracing::debug!("inbox of node {} closed", network.local_id);
        })
    }

    /// Send a request to a specific node and wait for its answer.
    pub async fn send(&self, node: NodeId, request: Request<V>) -> Result<RoundStepResult<V>> {
        let sender = self
            .senders
            .get(&node)
            .ok_or(CasPaxosError::NodeUnreachable(node))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send((request, reply_tx))
            .await
            .map_err(|_| CasPaxosError::Transport(format!("inbox of node {node} is closed")))?;

        reply_rx
            .await
            .map_err(|_| CasPaxosError::Transport(format!("node {node} dropped the reply")))
    }

    async fn send_all(
        &self,
        request: Request<V>,
        min_responses: usize,
        is_good: &StepPredicate<V>,
        timeout: Duration,
    ) -> Vec<RoundStepResult<V>> {
        let phase = Phase::of(&request);
        let mut results = Vec::with_capacity(self.nodes.len());
        let mut pending: FuturesUnordered<BoxFuture<'_, Option<RoundStepResult<V>>>> =
            FuturesUnordered::new();

        for &node in &self.nodes {
            metrics::record_message(request.type_name(), direction::SENT);

            match self.link_state(node, phase) {
                LinkState::Working => {
                    let request = request.clone();
                    pending.push(
                        async move {
                            match self.send(node, request).await {
                                Ok(result) => Some(result),
                                Err(e) => {
                                    tracing::warn!("{:?} to node {} failed: {}", phase, node, e);
                                    None
                                }
                            }
                        }
                        .boxed(),
                    );
                }
                LinkState::Silent => {
                    pending.push(future::pending::<Option<RoundStepResult<V>>>().boxed())
                }
                LinkState::Reject => results.push(RoundStepResult::rejected(None)),
            }
        }

        let mut good = results.iter().filter(|r| is_good(r)).count();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        while good < min_responses && good + pending.len() >= min_responses {
            tokio::select! {
                next = pending.next() => match next {
                    Some(Some(result)) => {
                        metrics::record_message(request.type_name(), direction::RECEIVED);
                        if is_good(&result) {
                            good += 1;
                        }
                        results.push(result);
                    }
                    Some(None) => {}
                    None => break,
                },
                _ = &mut deadline => {
                    tracing::debug!(
                        "{:?} timed out after {:?} with {} answers",
                        phase,
                        timeout,
                        results.len()
                    );
                    break;
                }
            }
        }

        results
    }
}

#[async_trait]
impl<V> Network<V> for ChannelNetwork<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn all_nodes(&self) -> Vec<NodeId> {
        self.nodes.clone()
    }

    async fn send_prepare(
        &self,
        prepare: &Prepare,
        min_responses: usize,
        is_good: &StepPredicate<V>,
        timeout: Duration,
    ) -> Result<Vec<RoundStepResult<V>>> {
        let span = tracing_ext::broadcast_span("Prepare", self.nodes.len());
        let request = Request::Prepare(prepare.clone());

        Ok(self
            .send_all(request, min_responses, is_good, timeout)
            .instrument(span)
            .await)
    }

    async fn send_accept(
        &self,
        accept: &Accept<V>,
        min_responses: usize,
        is_good: &StepPredicate<V>,
        timeout: Duration,
    ) -> Result<Vec<RoundStepResult<V>>> {
        let span = tracing_ext::broadcast_span("Accept", self.nodes.len());
        let request = Request::Accept(accept.clone());

        Ok(self
            .send_all(request, min_responses, is_good, timeout)
            .instrument(span)
            .await)
    }
}
