mod common;

use caspaxos::{LinkState, Phase, RoundOutcome};
use common::{increment, Cluster};
use std::time::Duration;
use tracing_test::traced_test;

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn silent_prepare_and_rejected_accept_still_commit() {
    let cluster = Cluster::new(5).await;
    cluster.set_link_state(3, Phase::Prepare, LinkState::Silent);
    cluster.set_link_state(1, Phase::Accept, LinkState::Reject);

    let result = cluster
        .node(0)
        .round("counter", increment, 3, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.outcome, RoundOutcome::Ok);
    assert_eq!(result.value(), Some(&1));
    assert!(result.responses >= 3);
}

#[tokio::test]
#[traced_test]
async fn three_rejected_accepts_conflict() {
    let cluster = Cluster::new(5).await;
    for node in 1..=3 {
        cluster.set_link_state(node, Phase::Accept, LinkState::Reject);
    }

    let node = cluster.node(0);
    let before = node.current_ballot().await;

    let result = node.round("counter", increment, 3, TIMEOUT).await.unwrap();

    assert_eq!(result.outcome, RoundOutcome::Conflict);
    assert!(!result.is_ok());
    assert_eq!(result.entry, None);
    assert_eq!(node.current_ballot().await.epoch, before.epoch + 1);
    assert!(logs_contain("failed in accept phase"));
}

#[tokio::test]
async fn failed_round_is_retried_by_the_caller() {
    let cluster = Cluster::new(5).await;
    for node in 1..=3 {
        cluster.set_link_state(node, Phase::Accept, LinkState::Reject);
    }

    let node = cluster.node(0);
    assert!(node
        .round("counter", increment, 3, TIMEOUT)
        .await
        .unwrap()
        .is_conflict());

    cluster.networks[0].set_all_working();

    let result = node.round("counter", increment, 3, TIMEOUT).await.unwrap();
    assert!(result.is_ok());
    assert!(result.value() >= Some(&1));
}

#[tokio::test]
async fn higher_promise_makes_prepare_conflict() {
    let cluster = Cluster::new(3).await;

    cluster
        .node(1)
        .round("k", |_| Some(10), 2, Duration::from_secs(5))
        .await
        .unwrap();

    // Every node promised a ballot far ahead of node 0
    let ahead = caspaxos::Ballot::new(50, 2, 0);
    for participant in &cluster.participants {
        let reply = participant
            .on_prepare(caspaxos::Prepare::new(ahead, "k"))
            .await
            .unwrap();
        assert!(reply.ok);
    }

    let node = cluster.node(0);
    let result = node.round("k", increment, 2, TIMEOUT).await.unwrap();

    assert!(result.is_conflict());
    assert!(result.responses >= 2);
    // Prepare rejections carry the stored entry
    assert_eq!(result.value(), Some(&10));
}

#[tokio::test(start_paused = true)]
async fn silence_without_rejection_times_out() {
    let cluster = Cluster::new(3).await;
    cluster.set_link_state(1, Phase::Prepare, LinkState::Silent);
    cluster.set_link_state(2, Phase::Prepare, LinkState::Silent);

    let node = cluster.node(0);
    let before = node.current_ballot().await;

    let result = node.round("k", increment, 2, TIMEOUT).await.unwrap();

    assert_eq!(result.outcome, RoundOutcome::Timeout);
    assert_eq!(result.entry, None);
    assert_eq!(result.responses, 1);
    assert!(node.current_ballot().await > before.increment_tiny(0).unwrap());
}

#[tokio::test(start_paused = true)]
async fn silence_plus_one_rejection_is_conflict() {
    let cluster = Cluster::new(3).await;
    cluster.set_link_state(1, Phase::Accept, LinkState::Silent);
    cluster.set_link_state(2, Phase::Accept, LinkState::Reject);

    let result = cluster
        .node(0)
        .round("k", increment, 2, TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.outcome, RoundOutcome::Conflict);
    assert_eq!(result.responses, 2);
}

#[tokio::test(start_paused = true)]
async fn quorum_above_cluster_size_never_commits() {
    let cluster = Cluster::new(3).await;

    let result = cluster
        .node(0)
        .round("k", increment, 4, TIMEOUT)
        .await
        .unwrap();

    assert!(!result.is_ok());
    assert_eq!(result.outcome, RoundOutcome::Timeout);
}
