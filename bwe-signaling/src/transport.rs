use async_trait::async_trait;
use shared::error::Result;

use crate::description::{IceCandidate, SessionDescription};

/// The peer connection as seen by signaling.
///
/// Implemented over the real ICE/DTLS/SRTP stack by the binary and by
/// in-memory fakes in tests. Local candidate discovery flows the other way:
/// the implementation calls
/// [`SignalingEndpoint::on_local_candidate_discovered`](crate::SignalingEndpoint::on_local_candidate_discovered).
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    /// Commits the local description. Starts local candidate gathering.
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()>;
}
