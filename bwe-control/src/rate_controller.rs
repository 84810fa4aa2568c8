use std::io::Write;
use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use shared::error::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::estimator::{BandwidthEstimator, EstimatorStats};
use crate::sink::EncodingSink;
use crate::telemetry::TelemetryWriter;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EstimateOutcome {
    /// Logged and forwarded to the sink.
    Applied(u64),
    /// Degenerate estimate; the sink keeps its previous target.
    Skipped(i64),
}

/// One estimate-changed notification with the estimator stats read when it fired.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Estimate {
    pub target_bps: i64,
    pub stats: EstimatorStats,
}

/// Applies bandwidth estimates to the encoding sink.
///
/// The estimator callback only enqueues the value and a stats snapshot. All
/// validation, telemetry and sink updates happen on the controller's own
/// loop, so the estimator's task never waits on a file write.
pub struct RateController<W: Write> {
    sink: Arc<EncodingSink>,
    telemetry: TelemetryWriter<W>,
    estimates_rx: mpsc::UnboundedReceiver<Estimate>,
}

impl<W: Write> RateController<W> {
    /// Subscribes to `estimator`. Call once, when the connection is established.
    pub fn new(
        estimator: Arc<dyn BandwidthEstimator>,
        sink: Arc<EncodingSink>,
        telemetry: TelemetryWriter<W>,
    ) -> Self {
        let (estimates_tx, estimates_rx) = mpsc::unbounded_channel();
        // Weak: the estimator owns this callback.
        let source: Weak<dyn BandwidthEstimator> = Arc::downgrade(&estimator);
        estimator.on_estimate_changed(Box::new(move |target_bps: i64| {
            let stats = source
                .upgrade()
                .map(|estimator| estimator.stats())
                .unwrap_or_default();
            if estimates_tx.send(Estimate { target_bps, stats }).is_err() {
                debug!("rate controller gone, estimate {target_bps} dropped");
            }
        }));

        Self {
            sink,
            telemetry,
            estimates_rx,
        }
    }

    pub fn handle_estimate(&mut self, estimate: Estimate) -> Result<EstimateOutcome> {
        let Estimate { target_bps, stats } = estimate;
        if target_bps < 0 {
            warn!("skipping negative target bitrate estimate {target_bps}");
            return Ok(EstimateOutcome::Skipped(target_bps));
        }

        let target = target_bps as u64;
        self.telemetry.append(target, stats)?;
        self.sink.set_target_bitrate(target);
        debug!("target bitrate set to {target} bps");
        Ok(EstimateOutcome::Applied(target))
    }

    /// Drains estimates until `shutdown` fires or the estimator is dropped.
    /// Estimates still queued once `shutdown` is cancelled are discarded.
    ///
    /// A telemetry write failure ends the loop with the error.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "rate control started at {} bps",
            self.sink.target_bitrate()
        );
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("rate control stopped");
                    return Ok(());
                }
                estimate = self.estimates_rx.recv() => {
                    let Some(estimate) = estimate else {
                        debug!("estimator dropped, rate control stopped");
                        return Ok(());
                    };
                    if shutdown.is_cancelled() {
                        debug!("rate control stopped");
                        return Ok(());
                    }
                    self.handle_estimate(estimate)?;
                }
            }
        }
    }
}
