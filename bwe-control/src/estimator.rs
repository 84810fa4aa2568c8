use std::fmt;
use std::time::Duration;

/// Callback fired by the estimator, on its own task, with each new target in bits per second.
///
/// A negative value is a degenerate estimate and must be ignored by the receiver.
pub type OnEstimateChangedFn = Box<dyn Fn(i64) + Send + Sync>;

/// The bandwidth estimator as the rate controller sees it.
pub trait BandwidthEstimator: Send + Sync {
    /// Registers a callback for every new estimate. Callbacks must not block.
    fn on_estimate_changed(&self, f: OnEstimateChangedFn);

    fn target_bitrate(&self) -> i64;

    /// Point-in-time snapshot of the estimator internals.
    fn stats(&self) -> EstimatorStats;
}

/// Delay-based detector output.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BandwidthUsage {
    #[default]
    Normal,
    Underusing,
    Overusing,
}

impl fmt::Display for BandwidthUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            BandwidthUsage::Normal => "normal",
            BandwidthUsage::Underusing => "underuse",
            BandwidthUsage::Overusing => "overuse",
        };
        write!(f, "{s}")
    }
}

/// Direction of the last rate change.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateControlState {
    #[default]
    Hold,
    Increase,
    Decrease,
}

impl fmt::Display for RateControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RateControlState::Hold => "hold",
            RateControlState::Increase => "increase",
            RateControlState::Decrease => "decrease",
        };
        write!(f, "{s}")
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct EstimatorStats {
    pub loss_target_bps: i64,
    /// Smoothed fraction of packets lost, 0.0 to 1.0.
    pub average_loss: f64,
    pub delay_target_bps: i64,
    pub delay_measurement_ms: f64,
    pub delay_estimate_ms: f64,
    pub delay_threshold_ms: f64,
    pub rtt: Duration,
    pub usage: BandwidthUsage,
    pub state: RateControlState,
}
