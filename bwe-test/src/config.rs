use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use signaling::Role;

pub const DEFAULT_LOG_DIR: &str = "log";
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_INITIAL_BITRATE: u64 = 800_000;

pub const DEFAULT_SEND_OFFER_ADDRESS: &str = "0.0.0.0:50000";
pub const DEFAULT_SEND_ANSWER_ADDRESS: &str = "localhost:60000";
pub const DEFAULT_RECEIVE_OFFER_ADDRESS: &str = "localhost:50000";
pub const DEFAULT_RECEIVE_ANSWER_ADDRESS: &str = "0.0.0.0:60000";

/// Everything one side of the test needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub role: Role,
    /// Where this node's signaling server listens.
    pub bind_address: String,
    /// The other node's signaling server.
    pub peer_address: String,
    pub log_dir: PathBuf,
    pub ice_servers: Vec<String>,
    pub initial_bitrate: u64,
}

impl NodeConfig {
    /// The sending side binds the offer address and dials the answer address.
    pub fn sender(offer: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::new(Role::Offerer, offer.into(), answer.into())
    }

    /// The receiving side binds the answer address and dials the offer address.
    pub fn receiver(offer: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::new(Role::Answerer, answer.into(), offer.into())
    }

    fn new(role: Role, bind_address: String, peer_address: String) -> Self {
        Self {
            role,
            bind_address,
            peer_address,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            ice_servers: vec![DEFAULT_STUN_SERVER.to_owned()],
            initial_bitrate: DEFAULT_INITIAL_BITRATE,
        }
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(name)
    }

    /// Resolves the bind address. Accepts host names and the `:port` shorthand.
    pub async fn resolve_bind(&self) -> Result<SocketAddr> {
        let addr = if self.bind_address.starts_with(':') {
            format!("0.0.0.0{}", self.bind_address)
        } else {
            self.bind_address.clone()
        };
        tokio::net::lookup_host(&addr)
            .await
            .with_context(|| format!("cannot resolve bind address {addr}"))?
            .next()
            .ok_or_else(|| anyhow!("bind address {addr} resolved to nothing"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roles_pick_opposite_addresses() {
        let send = NodeConfig::sender(DEFAULT_SEND_OFFER_ADDRESS, DEFAULT_SEND_ANSWER_ADDRESS);
        assert_eq!(send.role, Role::Offerer);
        assert_eq!(send.bind_address, "0.0.0.0:50000");
        assert_eq!(send.peer_address, "localhost:60000");

        let receive = NodeConfig::receiver(
            DEFAULT_RECEIVE_OFFER_ADDRESS,
            DEFAULT_RECEIVE_ANSWER_ADDRESS,
        );
        assert_eq!(receive.role, Role::Answerer);
        assert_eq!(receive.bind_address, "0.0.0.0:60000");
        assert_eq!(receive.peer_address, "localhost:50000");

        assert_eq!(receive.initial_bitrate, 800_000);
        assert_eq!(receive.ice_servers, vec!["stun:stun.l.google.com:19302"]);
        assert_eq!(receive.log_path("rtp_in.log"), PathBuf::from("log/rtp_in.log"));
    }

    #[tokio::test]
    async fn test_resolve_bind() -> Result<()> {
        let config = NodeConfig::sender(":50000", "localhost:60000");
        assert_eq!(config.resolve_bind().await?, "0.0.0.0:50000".parse::<SocketAddr>()?);

        let config = NodeConfig::receiver("localhost:50000", "127.0.0.1:0");
        assert_eq!(config.resolve_bind().await?, "127.0.0.1:0".parse::<SocketAddr>()?);

        let config = NodeConfig::sender("not an address", "localhost:60000");
        assert!(config.resolve_bind().await.is_err());
        Ok(())
    }
}
