use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use shared::error::{Error, Result};
use tokio::sync::{Mutex, mpsc};

use crate::candidate::{CandidateBuffer, Disposition};
use crate::client::SignalingClient;
use crate::description::{IceCandidate, Role, SdpType, SessionDescription};
use crate::transport::PeerTransport;

/// One side of the signaling exchange.
///
/// Owns the pending candidate queue and the mutex guarding it. Errors that
/// happen where nobody can return them (HTTP handlers, transport callbacks)
/// are handed to [`SignalingEndpoint::report_fatal`] and surface on the
/// receiver returned by [`SignalingEndpoint::new`].
pub struct SignalingEndpoint {
    role: Role,
    transport: Arc<dyn PeerTransport>,
    client: SignalingClient,
    candidates: Mutex<CandidateBuffer>,
    // Kept outside the candidate mutex: inbound handlers must not wait on a flush
    // that is itself waiting on the peer's handlers.
    closed: AtomicBool,
    fatal_tx: mpsc::UnboundedSender<Error>,
}

impl SignalingEndpoint {
    pub fn new(
        role: Role,
        transport: Arc<dyn PeerTransport>,
        client: SignalingClient,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Error>) {
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let endpoint = Arc::new(Self {
            role,
            transport,
            client,
            candidates: Mutex::new(CandidateBuffer::new()),
            closed: AtomicBool::new(false),
            fatal_tx,
        });
        (endpoint, fatal_rx)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn peer_address(&self) -> &str {
        self.client.peer_address()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of candidates still waiting for the remote description.
    pub async fn pending_candidates(&self) -> usize {
        self.candidates.lock().await.len()
    }

    pub async fn send_description(&self, desc: &SessionDescription) -> Result<()> {
        self.ensure_open()?;
        self.client.send_description(desc).await
    }

    pub async fn send_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        self.ensure_open()?;
        self.client.send_candidate(candidate).await
    }

    /// Offerer handshake: create the offer, commit it locally (which starts
    /// gathering) and post it to the peer.
    pub async fn start_offer(&self) -> Result<()> {
        if self.role != Role::Offerer {
            return Err(Error::ErrUnexpectedDescription(SdpType::Offer.to_string()));
        }
        self.ensure_open()?;
        let offer = self.transport.create_offer().await?;
        self.transport.set_local_description(offer.clone()).await?;
        self.send_description(&offer).await?;
        info!("offer sent to {}", self.peer_address());
        Ok(())
    }

    /// Entry point for the transport's local candidate notifications.
    pub async fn on_local_candidate_discovered(&self, candidate: IceCandidate) -> Result<()> {
        let mut candidates = self.candidates.lock().await;
        self.sync_closed(&mut candidates);
        match candidates.push(candidate) {
            Disposition::Queued(seq) => {
                debug!("candidate #{seq} queued until remote description is applied");
            }
            Disposition::SendNow(candidate) => {
                self.send_candidate(&candidate).await?;
            }
            Disposition::Dropped(candidate) => {
                debug!("endpoint closed, dropping candidate {candidate}");
            }
        }
        Ok(())
    }

    /// Sends every queued candidate in discovery order, then switches the
    /// buffer to immediate sends.
    pub async fn on_remote_description_applied(&self) -> Result<()> {
        let mut candidates = self.candidates.lock().await;
        self.sync_closed(&mut candidates);
        let pending = candidates.take_pending();
        let total = pending.len();
        for (sent, candidate) in pending.iter().enumerate() {
            if let Err(err) = self.send_candidate(candidate).await {
                warn!(
                    "flush aborted, {} of {total} queued candidates not sent",
                    total - sent
                );
                return Err(err);
            }
        }
        debug!("flushed {total} queued candidates");
        Ok(())
    }

    /// Handles an inbound `/sdp` body.
    ///
    /// The offerer applies the answer. The answerer applies the offer, posts
    /// back its answer and only then commits it locally.
    pub async fn handle_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.ensure_open()?;
        match (self.role, desc.sdp_type) {
            (Role::Offerer, SdpType::Answer) => {
                self.transport.set_remote_description(desc).await?;
                info!("remote answer applied");
            }
            (Role::Answerer, SdpType::Offer) => {
                self.transport.set_remote_description(desc).await?;
                info!("remote offer applied");

                let answer = self.transport.create_answer().await?;
                self.send_description(&answer).await?;
                self.transport.set_local_description(answer).await?;
                info!("answer sent to {} and committed", self.peer_address());
            }
            (_, sdp_type) => return Err(Error::ErrUnexpectedDescription(sdp_type.to_string())),
        }
        self.on_remote_description_applied().await
    }

    /// Handles an inbound `/candidate` body. Remote candidates are always
    /// applied right away.
    pub async fn handle_remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.ensure_open()?;
        debug!("applying remote candidate {candidate}");
        self.transport.add_remote_candidate(candidate).await
    }

    /// Stops all further signaling. Queued candidates are discarded.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // A flush blocked on the peer holds the lock; it notices `closed` on its next send.
        match self.candidates.try_lock() {
            Ok(mut candidates) => {
                let dropped = candidates.close();
                if dropped > 0 {
                    warn!("signaling closed with {dropped} candidates never sent");
                }
            }
            Err(_) => debug!("signaling closed while a candidate send was in flight"),
        }
    }

    pub fn report_fatal(&self, err: Error) {
        if self.is_closed() {
            debug!("ignoring error after close: {err}");
            return;
        }
        let _ = self.fatal_tx.send(err);
    }

    // Catches up on a close() that could not take the lock.
    fn sync_closed(&self, candidates: &mut CandidateBuffer) {
        if self.is_closed() && !candidates.is_closed() {
            let dropped = candidates.close();
            if dropped > 0 {
                warn!("signaling closed with {dropped} candidates never sent");
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ErrEndpointClosed)
        } else {
            Ok(())
        }
    }
}
