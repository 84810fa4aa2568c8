use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Offset in seconds between the unix epoch and the ntp epoch.
const NTP_EPOCH_OFFSET: u64 = 0x83AA7E80;

pub fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
}

pub fn unix2ntp(duration_since_unix_epoch: Duration) -> u64 {
    let u = duration_since_unix_epoch.as_nanos() as u64;

    let mut s = u / 1_000_000_000;
    s += NTP_EPOCH_OFFSET;
    let mut f = u % 1_000_000_000;
    f <<= 32;
    f /= 1_000_000_000;
    s <<= 32;

    s | f
}

/// Middle 32 bits of the 64 bit ntp timestamp, the unit RTCP uses for
/// LSR and DLSR (1/65536 seconds).
pub fn compact_ntp(ntp: u64) -> u32 {
    ((ntp >> 16) & 0xFFFF_FFFF) as u32
}

/// Round trip time from a reception report block, as described in RFC 3550 6.4.1.
///
/// Returns `None` when no sender report has been acknowledged yet (LSR is zero)
/// or when the result would be negative because of clock skew.
pub fn rtt_from_report(now_compact: u32, last_sender_report: u32, delay: u32) -> Option<Duration> {
    if last_sender_report == 0 {
        return None;
    }
    let rtt = now_compact
        .checked_sub(last_sender_report)?
        .checked_sub(delay)?;
    Some(Duration::from_micros(u64::from(rtt) * 1_000_000 / 65536))
}

/// Wall clock in unix milliseconds that never goes backwards, even if the
/// system clock is stepped between two readings.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_ms: i64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&mut self) -> i64 {
        self.observe(chrono::Utc::now().timestamp_millis())
    }

    pub fn observe(&mut self, wall_ms: i64) -> i64 {
        self.last_ms = self.last_ms.max(wall_ms);
        self.last_ms
    }
}
