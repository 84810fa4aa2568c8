use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use shared::error::Result;
use shared::time::MonotonicClock;

use crate::estimator::EstimatorStats;

/// One applied estimate, as written to the congestion control log.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub unix_ms: i64,
    pub target_bps: u64,
    pub stats: EstimatorStats,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        write!(
            f,
            "{}, {}, {}, {:.4}, {}, {:.3}, {:.3}, {:.3}, {}, {}, {}",
            self.unix_ms,
            self.target_bps,
            s.loss_target_bps,
            s.average_loss,
            s.delay_target_bps,
            s.delay_measurement_ms,
            s.delay_estimate_ms,
            s.delay_threshold_ms,
            s.rtt.as_millis(),
            s.usage,
            s.state,
        )
    }
}

/// Append-only telemetry sink. Each record goes out as a single line write.
pub struct TelemetryWriter<W: Write> {
    out: W,
    clock: MonotonicClock,
}

impl TelemetryWriter<BufWriter<File>> {
    /// Starts a fresh log for this run; an existing file is truncated.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TelemetryWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            clock: MonotonicClock::new(),
        }
    }

    pub fn append(&mut self, target_bps: u64, stats: EstimatorStats) -> Result<TelemetryRecord> {
        let record = TelemetryRecord {
            unix_ms: self.clock.now_ms(),
            target_bps,
            stats,
        };
        let line = format!("{record}\n");
        self.out.write_all(line.as_bytes())?;
        self.out.flush()?;
        Ok(record)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
