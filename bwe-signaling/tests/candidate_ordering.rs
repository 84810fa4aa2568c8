//! Ordering and no-loss guarantees of trickled local candidates.
//!
//! Candidates discovered before the remote description is applied must reach
//! the peer in discovery order, exactly once, and only after the flush;
//! candidates discovered afterwards go out immediately. The interleaving tests
//! race discovery against remote description application in both orders.

extern crate bwe_signaling as signaling;

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{FakeTransport, RecordingPeer, init_logger, unreachable_addr};
use shared::error::Error;
use signaling::{IceCandidate, Role, SignalingClient, SignalingEndpoint};

fn endpoint_for(peer: &RecordingPeer, role: Role) -> Arc<SignalingEndpoint> {
    let (endpoint, _fatal_rx) = SignalingEndpoint::new(
        role,
        FakeTransport::new(),
        SignalingClient::new(peer.addr.to_string()),
    );
    endpoint
}

#[tokio::test]
async fn test_queued_candidates_flush_in_order() -> Result<()> {
    init_logger();
    let peer = RecordingPeer::start().await?;
    let endpoint = endpoint_for(&peer, Role::Offerer);

    for c in ["cand-1", "cand-2", "cand-3"] {
        endpoint
            .on_local_candidate_discovered(IceCandidate::new(c))
            .await?;
    }
    assert!(peer.candidates().is_empty(), "nothing may be sent before the flush");
    assert_eq!(endpoint.pending_candidates().await, 3);

    endpoint.on_remote_description_applied().await?;

    assert_eq!(peer.candidates(), vec!["cand-1", "cand-2", "cand-3"]);
    assert_eq!(endpoint.pending_candidates().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_candidates_after_flush_are_sent_immediately() -> Result<()> {
    init_logger();
    let peer = RecordingPeer::start().await?;
    let endpoint = endpoint_for(&peer, Role::Answerer);

    endpoint
        .on_local_candidate_discovered(IceCandidate::new("cand-1"))
        .await?;
    endpoint.on_remote_description_applied().await?;
    endpoint
        .on_local_candidate_discovered(IceCandidate::new("cand-2"))
        .await?;

    assert_eq!(peer.candidates(), vec!["cand-1", "cand-2"]);
    assert_eq!(endpoint.pending_candidates().await, 0);

    // A second application flushes nothing and duplicates nothing.
    endpoint.on_remote_description_applied().await?;
    assert_eq!(peer.candidates(), vec!["cand-1", "cand-2"]);
    Ok(())
}

async fn race(remote_after: usize, total: usize) -> Result<Vec<String>> {
    let peer = RecordingPeer::start().await?;
    let endpoint = endpoint_for(&peer, Role::Offerer);

    let discovering = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move {
            for i in 0..total {
                endpoint
                    .on_local_candidate_discovered(IceCandidate::new(format!("cand-{i}")))
                    .await?;
                tokio::task::yield_now().await;
            }
            Ok::<_, Error>(())
        })
    };

    let applying = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move {
            for _ in 0..remote_after {
                tokio::task::yield_now().await;
            }
            endpoint.on_remote_description_applied().await
        })
    };

    discovering.await??;
    applying.await??;
    assert_eq!(endpoint.pending_candidates().await, 0);
    Ok(peer.candidates())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_discovery_and_remote_description_race() -> Result<()> {
    init_logger();
    let total = 12;
    let expected: Vec<String> = (0..total).map(|i| format!("cand-{i}")).collect();

    // 0 applies the remote description before most discoveries, larger values after.
    for remote_after in [0, 1, 3, 6, 11, 40] {
        let sent = race(remote_after, total).await?;
        assert_eq!(sent, expected, "remote applied after {remote_after} yields");
    }
    Ok(())
}

#[tokio::test]
async fn test_close_drops_queued_and_later_candidates() -> Result<()> {
    init_logger();
    let peer = RecordingPeer::start().await?;
    let endpoint = endpoint_for(&peer, Role::Offerer);

    endpoint
        .on_local_candidate_discovered(IceCandidate::new("cand-1"))
        .await?;
    endpoint.close();
    endpoint
        .on_local_candidate_discovered(IceCandidate::new("cand-2"))
        .await?;
    endpoint.on_remote_description_applied().await?;

    assert!(peer.requests().is_empty());
    assert_eq!(endpoint.pending_candidates().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_send_failure_is_reported() -> Result<()> {
    init_logger();
    let (endpoint, _fatal_rx) = SignalingEndpoint::new(
        Role::Offerer,
        FakeTransport::new(),
        SignalingClient::new(unreachable_addr().await?.to_string()),
    );

    endpoint
        .on_local_candidate_discovered(IceCandidate::new("cand-1"))
        .await?;
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        endpoint.on_remote_description_applied(),
    )
    .await?;
    assert!(matches!(result, Err(Error::ErrSignalingTransport(_))));
    Ok(())
}
