use std::sync::Arc;

use anyhow::{Error, Result};
use control::ConnectionLifecycleMonitor;
use log::{info, warn};
use signaling::SignalingEndpoint;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use webrtc::peer_connection::RTCPeerConnection;

/// How a role runner ended when it did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Interrupted,
    ConnectionFailed,
}

/// The pieces every role owns for its whole run.
pub struct Node {
    pub pc: Arc<RTCPeerConnection>,
    pub endpoint: Arc<SignalingEndpoint>,
    pub monitor: Arc<ConnectionLifecycleMonitor>,
    pub shutdown: CancellationToken,
    pub fatal_rx: mpsc::UnboundedReceiver<shared::error::Error>,
    pub server: JoinHandle<()>,
}

impl Node {
    /// Blocks until the first of: a fatal signaling error, a terminal
    /// connection state, or ctrl-c.
    pub async fn supervise(&mut self) -> Result<RunOutcome> {
        println!("Press ctrl-c to stop");
        tokio::select! {
            Some(err) = self.fatal_rx.recv() => {
                Err(Error::new(err).context("signaling failed"))
            }
            _ = self.shutdown.cancelled() => {
                if self.monitor.is_terminated() {
                    Ok(RunOutcome::ConnectionFailed)
                } else {
                    Ok(RunOutcome::Interrupted)
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                Ok(RunOutcome::Interrupted)
            }
        }
    }

    /// Stops signaling first so nothing new goes out, then the loops, then the connection.
    pub async fn teardown(self) {
        self.endpoint.close();
        self.shutdown.cancel();
        self.server.abort();
        if let Err(err) = self.pc.close().await {
            warn!("cannot close peer connection: {err}");
        }
        info!("{} stopped", self.endpoint.role());
    }
}
