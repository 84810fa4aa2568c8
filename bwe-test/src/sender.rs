use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use control::{
    ConnectionLifecycleMonitor, EncodingSink, Frame, LossDelayEstimator, MediaWriter,
    RateController, SyntheticEncoder, TelemetryWriter,
};
use log::{info, warn};
use shared::error::Error;
use shared::time::{compact_ntp, rtt_from_report, unix2ntp, unix_now};
use signaling::server::serve;
use signaling::{Role, SignalingClient, SignalingEndpoint};
use tokio_util::sync::CancellationToken;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::media::Sample;
use webrtc::rtcp::receiver_report::ReceiverReport;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::config::NodeConfig;
use crate::dump::{self, CC_LOG, FRAMES_OUT_LOG, PacketLog, RTCP_IN_LOG, RTP_OUT_LOG};
use crate::interceptor::{DumpKind, PacketDumpBuilder};
use crate::node::{Node, RunOutcome};
use crate::peer::{self, WebrtcTransport};

/// Writes encoder output to the local video track.
struct TrackWriter {
    track: Arc<TrackLocalStaticSample>,
    frames: Arc<PacketLog>,
}

#[async_trait]
impl MediaWriter for TrackWriter {
    async fn write_frame(&self, frame: &Frame) -> shared::error::Result<()> {
        self.track
            .write_sample(&Sample {
                data: frame.content.clone(),
                duration: frame.duration,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::ErrTransport(e.to_string()))?;
        self.frames.append(&dump::frame_line(
            chrono::Utc::now().timestamp_millis(),
            frame,
        ))
    }
}

/// The offering side: sends one VP8 track whose rate follows the estimator.
pub async fn run(config: NodeConfig) -> Result<RunOutcome> {
    std::fs::create_dir_all(&config.log_dir)?;
    let rtp_out_log = Arc::new(PacketLog::create(config.log_path(RTP_OUT_LOG))?);
    let rtcp_log = Arc::new(PacketLog::create(config.log_path(RTCP_IN_LOG))?);
    let frames_log = Arc::new(PacketLog::create(config.log_path(FRAMES_OUT_LOG))?);
    let telemetry = TelemetryWriter::create(config.log_path(CC_LOG))?;

    let pc = peer::new_peer_connection(
        &config,
        PacketDumpBuilder::new(DumpKind::RtpOut, rtp_out_log),
    )
    .await?;
    let track = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            ..Default::default()
        },
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    let rtp_sender = pc
        .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
        .await?;

    let shutdown = CancellationToken::new();
    let monitor = Arc::new(ConnectionLifecycleMonitor::new(shutdown.clone()));
    let (endpoint, fatal_rx) = SignalingEndpoint::new(
        Role::Offerer,
        Arc::new(WebrtcTransport::new(Arc::clone(&pc))),
        SignalingClient::new(config.peer_address.clone()),
    );
    peer::forward_local_candidates(&pc, &endpoint);
    peer::forward_connection_state(&pc, &monitor, &endpoint);
    let (_, server) = serve(Arc::clone(&endpoint), config.resolve_bind().await?)?;

    let mut node = Node {
        pc,
        endpoint,
        monitor,
        shutdown,
        fatal_rx,
        server,
    };

    let estimator = Arc::new(LossDelayEstimator::new(config.initial_bitrate));
    let rtcp_reader = tokio::spawn(read_rtcp(
        rtp_sender,
        Arc::clone(&estimator),
        rtcp_log,
        node.shutdown.clone(),
    ));
    let media = {
        let monitor = Arc::clone(&node.monitor);
        let endpoint = Arc::clone(&node.endpoint);
        let shutdown = node.shutdown.clone();
        let initial_bitrate = config.initial_bitrate;
        tokio::spawn(async move {
            if !monitor.wait_connected().await {
                return;
            }
            info!("connected, sending media at {initial_bitrate} bps");
            let writer = Arc::new(TrackWriter {
                track,
                frames: frames_log,
            });
            let sink = Arc::new(EncodingSink::new(initial_bitrate, writer));
            let controller = RateController::new(estimator, Arc::clone(&sink), telemetry);
            let encoder = SyntheticEncoder::new(sink);
            if let Err(err) = tokio::try_join!(
                controller.run(shutdown.clone()),
                encoder.run(shutdown.clone())
            ) {
                endpoint.report_fatal(err);
            }
        })
    };

    let outcome = match node.endpoint.start_offer().await {
        Ok(()) => node.supervise().await,
        Err(err) => Err(anyhow::Error::new(err).context("offer failed")),
    };

    node.teardown().await;
    for task in [rtcp_reader, media] {
        if let Err(err) = task.await {
            warn!("sender task ended abnormally: {err}");
        }
    }
    outcome
}

/// Drains RTCP for the video track: dumps it and feeds reception reports
/// to the estimator.
async fn read_rtcp(
    rtp_sender: Arc<RTCRtpSender>,
    estimator: Arc<LossDelayEstimator>,
    log: Arc<PacketLog>,
    shutdown: CancellationToken,
) {
    loop {
        let pkts = tokio::select! {
            _ = shutdown.cancelled() => return,
            res = rtp_sender.read_rtcp() => match res {
                Ok((pkts, _)) => pkts,
                Err(err) => {
                    info!("rtp sender stopped reading rtcp: {err}");
                    return;
                }
            },
        };

        let now = unix_now();
        if let Err(err) = log.append(&dump::rtcp_line(now.as_millis() as i64, &pkts)) {
            warn!("cannot write rtcp dump: {err}");
        }

        let now_compact = compact_ntp(unix2ntp(now));
        for pkt in &pkts {
            let Some(rr) = pkt.as_any().downcast_ref::<ReceiverReport>() else {
                continue;
            };
            for report in &rr.reports {
                let rtt = rtt_from_report(now_compact, report.last_sender_report, report.delay);
                estimator.on_receiver_report(report.fraction_lost, rtt);
            }
        }
    }
}
