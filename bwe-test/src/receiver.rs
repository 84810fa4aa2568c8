use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use control::ConnectionLifecycleMonitor;
use log::{info, warn};
use signaling::server::serve;
use signaling::{Role, SignalingClient, SignalingEndpoint};
use tokio_util::sync::CancellationToken;
use webrtc::track::track_remote::TrackRemote;
use webrtc::util::MarshalSize;

use crate::config::NodeConfig;
use crate::dump::{self, PacketLog, RTCP_OUT_LOG, RTP_IN_LOG};
use crate::interceptor::{DumpKind, PacketDumpBuilder};
use crate::node::{Node, RunOutcome};
use crate::peer::{self, WebrtcTransport};

const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// The answering side: accepts the offer and records every RTP packet it
/// receives and every RTCP packet it sends back.
pub async fn run(config: NodeConfig) -> Result<RunOutcome> {
    std::fs::create_dir_all(&config.log_dir)?;
    let rtp_log = Arc::new(PacketLog::create(config.log_path(RTP_IN_LOG))?);
    let rtcp_out_log = Arc::new(PacketLog::create(config.log_path(RTCP_OUT_LOG))?);

    let pc = peer::new_peer_connection(
        &config,
        PacketDumpBuilder::new(DumpKind::RtcpOut, rtcp_out_log),
    )
    .await?;
    let shutdown = CancellationToken::new();
    let monitor = Arc::new(ConnectionLifecycleMonitor::new(shutdown.clone()));
    let (endpoint, fatal_rx) = SignalingEndpoint::new(
        Role::Answerer,
        Arc::new(WebrtcTransport::new(Arc::clone(&pc))),
        SignalingClient::new(config.peer_address.clone()),
    );
    peer::forward_local_candidates(&pc, &endpoint);
    peer::forward_connection_state(&pc, &monitor, &endpoint);

    {
        let shutdown = shutdown.clone();
        pc.on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
            let rtp_log = Arc::clone(&rtp_log);
            let shutdown = shutdown.clone();
            Box::pin(async move {
                tokio::spawn(read_track(track, rtp_log, shutdown));
            })
        }));
    }

    let (_, server) = serve(Arc::clone(&endpoint), config.resolve_bind().await?)?;
    info!("waiting for offer from http://{}", config.peer_address);

    let mut node = Node {
        pc,
        endpoint,
        monitor,
        shutdown,
        fatal_rx,
        server,
    };
    let outcome = node.supervise().await;
    node.teardown().await;
    outcome
}

/// Reads one remote track until it goes quiet for a second, ends, or shutdown.
async fn read_track(track: Arc<TrackRemote>, log: Arc<PacketLog>, shutdown: CancellationToken) {
    info!(
        "got track with codec {}",
        track.codec().capability.mime_type
    );
    loop {
        let res = tokio::select! {
            _ = shutdown.cancelled() => return,
            res = tokio::time::timeout(READ_TIMEOUT, track.read_rtp()) => res,
        };
        let pkt = match res {
            Ok(Ok((pkt, _))) => pkt,
            Ok(Err(err)) => {
                info!("track.read_rtp returned error: {err}");
                return;
            }
            Err(_) => {
                info!("no rtp received for {READ_TIMEOUT:?}, track reader stopped");
                return;
            }
        };
        let line = dump::rtp_line(
            chrono::Utc::now().timestamp_millis(),
            &pkt.header,
            pkt.marshal_size(),
        );
        if let Err(err) = log.append(&line) {
            warn!("cannot write rtp dump: {err}");
            return;
        }
    }
}
