use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::estimator::{
    BandwidthEstimator, BandwidthUsage, EstimatorStats, OnEstimateChangedFn, RateControlState,
};

pub(crate) const MIN_BITRATE_BPS: u64 = 10_000;
pub(crate) const MAX_BITRATE_BPS: u64 = 20_000_000;

const LOSS_HIGH: f64 = 0.10;
const LOSS_LOW: f64 = 0.02;
const INCREASE_FACTOR: f64 = 1.08;
const LOSS_SMOOTHING: f64 = 0.8;

const DELAY_THRESHOLD_MS: f64 = 12.5;
const DELAY_SMOOTHING: f64 = 0.9;
const OVERUSE_BACKOFF: f64 = 0.85;

#[derive(Debug)]
struct EstimatorState {
    loss_target: u64,
    delay_target: u64,
    average_loss: f64,
    min_rtt: Option<Duration>,
    rtt: Duration,
    delay_measurement_ms: f64,
    delay_estimate_ms: f64,
    usage: BandwidthUsage,
    state: RateControlState,
}

impl EstimatorState {
    fn target(&self) -> u64 {
        self.loss_target.min(self.delay_target)
    }

    fn stats(&self) -> EstimatorStats {
        EstimatorStats {
            loss_target_bps: self.loss_target as i64,
            average_loss: self.average_loss,
            delay_target_bps: self.delay_target as i64,
            delay_measurement_ms: self.delay_measurement_ms,
            delay_estimate_ms: self.delay_estimate_ms,
            delay_threshold_ms: DELAY_THRESHOLD_MS,
            rtt: self.rtt,
            usage: self.usage,
            state: self.state,
        }
    }

    fn update_loss(&mut self, loss: f64) {
        self.average_loss = LOSS_SMOOTHING * self.average_loss + (1.0 - LOSS_SMOOTHING) * loss;

        let current = self.loss_target as f64;
        let next = if loss > LOSS_HIGH {
            current * (1.0 - 0.5 * loss)
        } else if loss < LOSS_LOW {
            current * INCREASE_FACTOR
        } else {
            current
        };
        self.loss_target = clamp(next);
    }

    fn update_delay(&mut self, rtt: Option<Duration>) {
        let Some(rtt) = rtt else {
            // No delay signal: the loss controller alone decides.
            self.delay_target = self.loss_target;
            return;
        };

        self.rtt = rtt;
        let min_rtt = *self.min_rtt.get_or_insert(rtt);
        let min_rtt = min_rtt.min(rtt);
        self.min_rtt = Some(min_rtt);

        let measurement = (rtt - min_rtt).as_secs_f64() * 1000.0;
        let previous_estimate = self.delay_estimate_ms;
        self.delay_measurement_ms = measurement;
        self.delay_estimate_ms =
            DELAY_SMOOTHING * previous_estimate + (1.0 - DELAY_SMOOTHING) * measurement;

        self.usage = if self.delay_estimate_ms > DELAY_THRESHOLD_MS {
            BandwidthUsage::Overusing
        } else if measurement + DELAY_THRESHOLD_MS < previous_estimate {
            BandwidthUsage::Underusing
        } else {
            BandwidthUsage::Normal
        };

        let current = self.target() as f64;
        self.delay_target = match self.usage {
            BandwidthUsage::Overusing => clamp(current * OVERUSE_BACKOFF),
            // Queues are draining; wait for them before probing again.
            BandwidthUsage::Underusing => self.delay_target,
            BandwidthUsage::Normal => clamp(self.delay_target as f64 * INCREASE_FACTOR),
        };
    }
}

fn clamp(bps: f64) -> u64 {
    (bps.max(0.0) as u64).clamp(MIN_BITRATE_BPS, MAX_BITRATE_BPS)
}

/// A compact loss and delay based estimator driven by RTCP receiver reports.
///
/// Loss above 10% backs off by half the loss ratio, loss under 2% steps up
/// by 8%. A smoothed queuing delay (RTT above the lowest RTT seen) over
/// 12.5 ms signals overuse and backs off by 15%. The published target is
/// the lower of the two.
pub struct LossDelayEstimator {
    state: Mutex<EstimatorState>,
    callbacks: Mutex<Vec<Arc<OnEstimateChangedFn>>>,
}

impl LossDelayEstimator {
    pub fn new(initial_bitrate: u64) -> Self {
        let initial = initial_bitrate.clamp(MIN_BITRATE_BPS, MAX_BITRATE_BPS);
        Self {
            state: Mutex::new(EstimatorState {
                loss_target: initial,
                delay_target: initial,
                average_loss: 0.0,
                min_rtt: None,
                rtt: Duration::ZERO,
                delay_measurement_ms: 0.0,
                delay_estimate_ms: 0.0,
                usage: BandwidthUsage::Normal,
                state: RateControlState::Hold,
            }),
            callbacks: Mutex::new(vec![]),
        }
    }

    /// Feeds one reception report block: `fraction_lost` in 1/256 units as
    /// carried on the wire, and the round trip time if it could be computed.
    ///
    /// Fires the estimate-changed callbacks on the calling task.
    pub fn on_receiver_report(&self, fraction_lost: u8, rtt: Option<Duration>) {
        let target = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(e) => {
                    warn!("estimator state poisoned: {e}");
                    return;
                }
            };
            let before = state.target();
            state.update_loss(f64::from(fraction_lost) / 256.0);
            state.update_delay(rtt);
            let after = state.target();
            state.state = if after > before {
                RateControlState::Increase
            } else if after < before {
                RateControlState::Decrease
            } else {
                RateControlState::Hold
            };
            debug!(
                "bwe: loss {:.3} usage {} -> {} bps",
                f64::from(fraction_lost) / 256.0,
                state.usage,
                after
            );
            after
        };

        let callbacks: Vec<Arc<OnEstimateChangedFn>> = match self.callbacks.lock() {
            Ok(callbacks) => callbacks.clone(),
            Err(_) => return,
        };
        for f in callbacks {
            f(target as i64);
        }
    }
}

impl BandwidthEstimator for LossDelayEstimator {
    fn on_estimate_changed(&self, f: OnEstimateChangedFn) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(Arc::new(f));
        }
    }

    fn target_bitrate(&self) -> i64 {
        self.state
            .lock()
            .map(|state| state.target() as i64)
            .unwrap_or(-1)
    }

    fn stats(&self) -> EstimatorStats {
        self.state
            .lock()
            .map(|state| state.stats())
            .unwrap_or_default()
    }
}
