//! Packet dumps for the outbound direction.
//!
//! Inbound packets are dumped where the application reads them. Outbound ones
//! never pass through application code once handed to the track, so they are
//! recorded by an interceptor registered innermost in the chain, where it sees
//! packets as they reach the transport (TWCC sequence numbers included).

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
type Result<T> = std::result::Result<T, webrtc::interceptor::Error>;
use webrtc::interceptor::stream_info::StreamInfo;
use webrtc::interceptor::{
    Attributes, Interceptor, InterceptorBuilder, RTCPReader, RTCPWriter, RTPReader, RTPWriter,
};
use webrtc::rtcp::packet::Packet as RtcpPacket;
use webrtc::rtp::extension::transport_cc_extension::TransportCcExtension;
use webrtc::rtp::header::Header;
use webrtc::rtp::packet::Packet as RtpPacket;
use webrtc::sdp::extmap::TRANSPORT_CC_URI;
use webrtc::util::{MarshalSize, Unmarshal};

use crate::dump::{self, PacketLog};

/// Which outbound stream a [`PacketDump`] records.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DumpKind {
    /// Media packets written to local tracks.
    RtpOut,
    /// Control packets written by this peer.
    RtcpOut,
}

pub struct PacketDumpBuilder {
    kind: DumpKind,
    log: Arc<PacketLog>,
}

impl PacketDumpBuilder {
    pub fn new(kind: DumpKind, log: Arc<PacketLog>) -> Self {
        Self { kind, log }
    }
}

impl InterceptorBuilder for PacketDumpBuilder {
    fn build(&self, _id: &str) -> Result<Arc<dyn Interceptor + Send + Sync>> {
        Ok(Arc::new(PacketDump {
            kind: self.kind,
            log: Arc::clone(&self.log),
        }))
    }
}

/// Pass-through interceptor that appends one line per outbound packet or compound packet.
pub struct PacketDump {
    kind: DumpKind,
    log: Arc<PacketLog>,
}

#[async_trait]
impl Interceptor for PacketDump {
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        reader
    }

    async fn bind_rtcp_writer(
        &self,
        writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        if self.kind != DumpKind::RtcpOut {
            return writer;
        }
        Arc::new(RtcpDumpWriter {
            next: writer,
            log: Arc::clone(&self.log),
        })
    }

    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        if self.kind != DumpKind::RtpOut {
            return writer;
        }
        Arc::new(RtpDumpWriter {
            next: writer,
            log: Arc::clone(&self.log),
            twcc_ext_id: twcc_extension_id(info),
        })
    }

    async fn unbind_local_stream(&self, _info: &StreamInfo) {}

    async fn bind_remote_stream(
        &self,
        _info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        reader
    }

    async fn unbind_remote_stream(&self, _info: &StreamInfo) {}

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn twcc_extension_id(info: &StreamInfo) -> Option<u8> {
    info.rtp_header_extensions
        .iter()
        .find(|ext| ext.uri == TRANSPORT_CC_URI)
        .map(|ext| ext.id as u8)
}

fn transport_sequence(header: &Header, ext_id: u8) -> Option<u16> {
    let mut ext = header.get_extension(ext_id)?;
    TransportCcExtension::unmarshal(&mut ext)
        .ok()
        .map(|tcc| tcc.transport_sequence)
}

struct RtpDumpWriter {
    next: Arc<dyn RTPWriter + Send + Sync>,
    log: Arc<PacketLog>,
    twcc_ext_id: Option<u8>,
}

#[async_trait]
impl RTPWriter for RtpDumpWriter {
    async fn write(&self, pkt: &RtpPacket, attributes: &Attributes) -> Result<usize> {
        let seq = self
            .twcc_ext_id
            .and_then(|id| transport_sequence(&pkt.header, id));
        let line = dump::rtp_out_line(
            chrono::Utc::now().timestamp_millis(),
            &pkt.header,
            pkt.marshal_size(),
            seq,
        );
        if let Err(err) = self.log.append(&line) {
            warn!("cannot write rtp dump: {err}");
        }
        self.next.write(pkt, attributes).await
    }
}

struct RtcpDumpWriter {
    next: Arc<dyn RTCPWriter + Send + Sync>,
    log: Arc<PacketLog>,
}

#[async_trait]
impl RTCPWriter for RtcpDumpWriter {
    async fn write(
        &self,
        pkts: &[Box<dyn RtcpPacket + Send + Sync>],
        attributes: &Attributes,
    ) -> Result<usize> {
        let line = dump::rtcp_line(chrono::Utc::now().timestamp_millis(), pkts);
        if let Err(err) = self.log.append(&line) {
            warn!("cannot write rtcp dump: {err}");
        }
        self.next.write(pkts, attributes).await
    }
}
