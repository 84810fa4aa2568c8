use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use rand::Rng;
use shared::error::Result;
use tokio_util::sync::CancellationToken;

use crate::sink::{EncodingSink, Frame};

pub const DEFAULT_FPS: u32 = 25;

/// Produces filler frames sized to the sink's current target bitrate.
///
/// Each frame is `target / 8 / fps` bytes scaled by a random factor in
/// `0.9..=1.1`, so the stream looks roughly like a real encoder tracking its
/// rate budget.
pub struct SyntheticEncoder {
    sink: Arc<EncodingSink>,
    fps: u32,
}

impl SyntheticEncoder {
    pub fn new(sink: Arc<EncodingSink>) -> Self {
        Self::with_fps(sink, DEFAULT_FPS)
    }

    pub fn with_fps(sink: Arc<EncodingSink>, fps: u32) -> Self {
        Self {
            sink,
            fps: fps.max(1),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }

    pub fn next_frame(&self) -> Frame {
        let target = self.sink.target_bitrate();
        let jitter: f64 = rand::rng().random_range(0.9..=1.1);
        let base = target as f64 / 8.0 / f64::from(self.fps);
        let size = ((base * jitter) as usize).max(1);

        Frame {
            content: Bytes::from(vec![0u8; size]),
            duration: self.frame_interval(),
            target_bitrate: target,
        }
    }

    /// Writes one frame per interval until `shutdown` fires or the sink
    /// rejects a frame.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.frame_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("encoder stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let frame = self.next_frame();
                    if let Err(err) = self.sink.write_frame(&frame).await {
                        warn!("encoder failed to write frame: {err}");
                        return Err(err);
                    }
                }
            }
        }
    }
}
