use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use control::Frame;
use shared::error::Result;
use webrtc::rtcp::packet::Packet as RtcpPacket;
use webrtc::rtcp::transport_feedbacks::transport_layer_cc::TransportLayerCc;
use webrtc::rtp::header::Header;

pub const RTP_IN_LOG: &str = "rtp_in.log";
pub const RTP_OUT_LOG: &str = "rtp_out.log";
pub const RTCP_IN_LOG: &str = "rtcp_in.log";
pub const RTCP_OUT_LOG: &str = "rtcp_out.log";
pub const FRAMES_OUT_LOG: &str = "frames_out.log";
pub const CC_LOG: &str = "cc.log";

/// Packet log shared by reader tasks and interceptors. One file per run.
pub struct PacketLog {
    out: Mutex<BufWriter<File>>,
}

impl PacketLog {
    /// Truncates whatever a previous run left at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn append(&self, line: &str) -> Result<()> {
        let mut out = self.out.lock()?;
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        out.write_all(buf.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// `unix_ms, payload_type, ssrc, sequence_number, timestamp, marker, size`
pub fn rtp_line(unix_ms: i64, header: &Header, size: usize) -> String {
    format!(
        "{}, {}, {}, {}, {}, {}, {}",
        unix_ms,
        header.payload_type,
        header.ssrc,
        header.sequence_number,
        header.timestamp,
        header.marker,
        size
    )
}

/// [`rtp_line`] plus the transport-wide sequence number, `-` when the packet carries none.
pub fn rtp_out_line(
    unix_ms: i64,
    header: &Header,
    size: usize,
    transport_sequence: Option<u16>,
) -> String {
    let mut line = rtp_line(unix_ms, header, size);
    match transport_sequence {
        Some(seq) => line.push_str(&format!(", {seq}")),
        None => line.push_str(", -"),
    }
    line
}

/// `unix_ms` and a tab, followed by every transport-wide feedback in the compound packet.
pub fn rtcp_line(unix_ms: i64, pkts: &[Box<dyn RtcpPacket + Send + Sync>]) -> String {
    let mut line = format!("{unix_ms}\t");
    for pkt in pkts {
        if let Some(twcc) = pkt.as_any().downcast_ref::<TransportLayerCc>() {
            line.push_str(&twcc.to_string());
        }
    }
    line
}

/// `unix_ms, frame_bytes, target_bps`
pub fn frame_line(unix_ms: i64, frame: &Frame) -> String {
    format!(
        "{}, {}, {}",
        unix_ms,
        frame.content.len(),
        frame.target_bitrate
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;
    use webrtc::rtcp::receiver_report::ReceiverReport;

    #[test]
    fn test_rtp_line() {
        let header = Header {
            marker: true,
            payload_type: 96,
            sequence_number: 27023,
            timestamp: 3_653_407_706,
            ssrc: 476_325_762,
            ..Default::default()
        };
        assert_eq!(
            rtp_line(1_700_000_000_000, &header, 1212),
            "1700000000000, 96, 476325762, 27023, 3653407706, true, 1212"
        );
    }

    #[test]
    fn test_rtp_out_line() {
        let header = Header {
            payload_type: 96,
            sequence_number: 1,
            timestamp: 90_000,
            ssrc: 5,
            ..Default::default()
        };
        assert_eq!(
            rtp_out_line(10, &header, 1200, Some(4242)),
            "10, 96, 5, 1, 90000, false, 1200, 4242"
        );
        assert_eq!(
            rtp_out_line(10, &header, 1200, None),
            "10, 96, 5, 1, 90000, false, 1200, -"
        );
    }

    #[test]
    fn test_rtcp_line_without_feedback() {
        let pkts: Vec<Box<dyn RtcpPacket + Send + Sync>> =
            vec![Box::new(ReceiverReport::default())];
        assert_eq!(rtcp_line(42, &pkts), "42\t");
    }

    #[test]
    fn test_frame_line() {
        let frame = Frame {
            content: Bytes::from(vec![0u8; 4000]),
            duration: Duration::from_millis(40),
            target_bitrate: 800_000,
        };
        assert_eq!(frame_line(7, &frame), "7, 4000, 800000");
    }

    #[test]
    fn test_packet_log_appends_lines() -> Result<()> {
        let path = std::env::temp_dir().join(format!("bwe-test-dump-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let log = PacketLog::create(&path)?;
        log.append("1, a")?;
        log.append("2, b")?;
        drop(log);

        let content = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(content, "1, a\n2, b\n");
        Ok(())
    }

    #[test]
    fn test_packet_log_starts_empty_each_run() -> Result<()> {
        let path = std::env::temp_dir().join(format!("bwe-test-rerun-{}.log", std::process::id()));

        let log = PacketLog::create(&path)?;
        log.append("1, old")?;
        drop(log);
        let log = PacketLog::create(&path)?;
        log.append("2, new")?;
        drop(log);

        let content = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(content, "2, new\n");
        Ok(())
    }
}
