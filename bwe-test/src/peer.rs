use std::sync::{Arc, Weak};

use anyhow::Result;
use async_trait::async_trait;
use control::{ConnectionLifecycleMonitor, ConnectionState, LifecycleAction};
use shared::error::Error;
use signaling::{IceCandidate, PeerTransport, SdpType, SessionDescription, SignalingEndpoint};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::{configure_nack, configure_rtcp_reports, configure_twcc};
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::config::NodeConfig;
use crate::interceptor::PacketDumpBuilder;

/// Builds a peer connection with the default codecs, NACK, RTCP reports and
/// both halves of TWCC (sequence numbers out, feedback back).
///
/// `dump` is registered first, so it wraps the writers closest to the transport.
pub async fn new_peer_connection(
    config: &NodeConfig,
    dump: PacketDumpBuilder,
) -> Result<Arc<RTCPeerConnection>> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;

    let mut registry = Registry::new();
    registry.add(Box::new(dump));
    let registry = configure_nack(registry, &mut media_engine);
    let registry = configure_rtcp_reports(registry);
    let registry = configure_twcc(registry, &mut media_engine)?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let rtc_config = RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: config.ice_servers.clone(),
            ..Default::default()
        }],
        ..Default::default()
    };

    Ok(Arc::new(api.new_peer_connection(rtc_config).await?))
}

fn transport_err(err: webrtc::Error) -> Error {
    Error::ErrTransport(err.to_string())
}

pub fn to_rtc_description(desc: SessionDescription) -> shared::error::Result<RTCSessionDescription> {
    let parsed = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpType::Rollback => {
            return Err(Error::ErrUnexpectedDescription(desc.sdp_type.to_string()));
        }
    };
    parsed.map_err(|e| Error::ErrMalformedDescription(e.to_string()))
}

pub fn from_rtc_description(desc: &RTCSessionDescription) -> shared::error::Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(Error::ErrUnexpectedDescription(desc.sdp_type.to_string()));
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp.clone(),
    })
}

pub fn connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        RTCPeerConnectionState::Unspecified => ConnectionState::Unspecified,
    }
}

/// [`PeerTransport`] over a webrtc-rs peer connection.
pub struct WebrtcTransport {
    pc: Arc<RTCPeerConnection>,
}

impl WebrtcTransport {
    pub fn new(pc: Arc<RTCPeerConnection>) -> Self {
        Self { pc }
    }
}

#[async_trait]
impl PeerTransport for WebrtcTransport {
    async fn create_offer(&self) -> shared::error::Result<SessionDescription> {
        let offer = self.pc.create_offer(None).await.map_err(transport_err)?;
        from_rtc_description(&offer)
    }

    async fn create_answer(&self) -> shared::error::Result<SessionDescription> {
        let answer = self.pc.create_answer(None).await.map_err(transport_err)?;
        from_rtc_description(&answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> shared::error::Result<()> {
        let desc = to_rtc_description(desc)?;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(transport_err)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> shared::error::Result<()> {
        let desc = to_rtc_description(desc)?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(transport_err)
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> shared::error::Result<()> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.into_inner(),
                ..Default::default()
            })
            .await
            .map_err(transport_err)
    }
}

/// Hands every locally gathered candidate to the endpoint. Send failures are fatal.
pub fn forward_local_candidates(pc: &RTCPeerConnection, endpoint: &Arc<SignalingEndpoint>) {
    // Weak: the endpoint owns the transport, which owns this peer connection.
    let endpoint: Weak<SignalingEndpoint> = Arc::downgrade(endpoint);
    pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let endpoint = endpoint.clone();
        Box::pin(async move {
            let (Some(c), Some(endpoint)) = (c, endpoint.upgrade()) else {
                return;
            };
            let candidate = match c.to_json() {
                Ok(init) => IceCandidate::new(init.candidate),
                Err(err) => {
                    endpoint.report_fatal(transport_err(err));
                    return;
                }
            };
            if let Err(err) = endpoint.on_local_candidate_discovered(candidate).await {
                endpoint.report_fatal(err);
            }
        })
    }));
}

/// Feeds connection state changes to the monitor. A terminal state closes signaling.
pub fn forward_connection_state(
    pc: &RTCPeerConnection,
    monitor: &Arc<ConnectionLifecycleMonitor>,
    endpoint: &Arc<SignalingEndpoint>,
) {
    let monitor = Arc::clone(monitor);
    let endpoint: Weak<SignalingEndpoint> = Arc::downgrade(endpoint);
    pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        if monitor.on_state_change(connection_state(s)) == LifecycleAction::Terminate {
            if let Some(endpoint) = endpoint.upgrade() {
                endpoint.close();
            }
        }
        Box::pin(async {})
    }));
}
