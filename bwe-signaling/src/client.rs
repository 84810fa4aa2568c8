use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use log::debug;
use shared::error::{Error, Result};

use crate::description::{IceCandidate, SessionDescription};

/// Outbound half of signaling: posts to the peer's `/sdp` and `/candidate`.
///
/// No retries. A failed post means the signaling channel is gone.
#[derive(Clone)]
pub struct SignalingClient {
    peer_address: String,
    client: Client<HttpConnector>,
}

impl SignalingClient {
    pub fn new(peer_address: impl Into<String>) -> Self {
        Self {
            peer_address: peer_address.into(),
            client: Client::new(),
        }
    }

    pub fn peer_address(&self) -> &str {
        &self.peer_address
    }

    pub async fn send_description(&self, desc: &SessionDescription) -> Result<()> {
        debug!("posting {} to http://{}/sdp", desc.sdp_type, self.peer_address);
        self.post("/sdp", desc.to_json()?).await
    }

    pub async fn send_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        debug!("posting candidate {candidate} to http://{}/candidate", self.peer_address);
        self.post("/candidate", candidate.as_str().as_bytes().to_vec())
            .await
    }

    async fn post(&self, path: &str, payload: Vec<u8>) -> Result<()> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{}{path}", self.peer_address))
            .header("content-type", "application/json; charset=utf-8")
            .body(Body::from(payload))
            .map_err(|e| Error::ErrSignalingTransport(e.to_string()))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| Error::ErrSignalingTransport(e.to_string()))?;

        let status = resp.status();
        hyper::body::to_bytes(resp.into_body())
            .await
            .map_err(|e| Error::ErrSignalingTransport(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::ErrPeerStatus(status.as_u16()));
        }
        Ok(())
    }
}
