//! Rate control and connection lifecycle for the sending side.
//!
//! The external bandwidth estimator fires estimate-changed callbacks on its
//! own task. [`RateController`] turns each, with the stats read at that moment, into a command on a channel it
//! drains itself, so the callback never blocks: validate, append a telemetry
//! line, forward the target to the [`EncodingSink`].

#![warn(rust_2018_idioms)]

pub mod encoder;
pub mod estimator;
pub mod lifecycle;
pub mod loss_delay;
pub mod rate_controller;
pub mod sink;
pub mod state;
pub mod telemetry;

pub use encoder::SyntheticEncoder;
pub use estimator::{
    BandwidthEstimator, BandwidthUsage, EstimatorStats, OnEstimateChangedFn, RateControlState,
};
pub use lifecycle::{ConnectionLifecycleMonitor, LifecycleAction};
pub use loss_delay::LossDelayEstimator;
pub use rate_controller::{Estimate, EstimateOutcome, RateController};
pub use sink::{EncodingSink, Frame, MediaWriter};
pub use state::ConnectionState;
pub use telemetry::{TelemetryRecord, TelemetryWriter};
