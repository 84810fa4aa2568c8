#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use shared::error::Result;
use signaling::{IceCandidate, PeerTransport, SessionDescription};
use tokio::task::JoinHandle;

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Records every call made on the transport, in order.
#[derive(Default)]
pub struct FakeTransport {
    pub calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record("create_offer".to_owned());
        Ok(SessionDescription::offer("v=0 offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record("create_answer".to_owned());
        Ok(SessionDescription::answer("v=0 answer"))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(format!("set_local {}", desc.sdp_type));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(format!("set_remote {}", desc.sdp_type));
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(format!("add_remote {candidate}"));
        Ok(())
    }
}

/// A stand-in signaling peer recording `(path, body)` of every POST it receives.
pub struct RecordingPeer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<(String, String)>>>,
    handle: JoinHandle<()>,
}

impl RecordingPeer {
    pub async fn start() -> anyhow::Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let make_svc = make_service_fn(move |_| {
            let recorded = Arc::clone(&recorded);
            async move {
                Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        let path = req.uri().path().to_owned();
                        let body = hyper::body::to_bytes(req.into_body()).await?;
                        if let Ok(mut r) = recorded.lock() {
                            r.push((path, String::from_utf8_lossy(&body).into_owned()));
                        }
                        let mut response = Response::new(Body::empty());
                        *response.status_mut() = StatusCode::OK;
                        Ok::<_, hyper::Error>(response)
                    }
                }))
            }
        });
        let server = Server::try_bind(&"127.0.0.1:0".parse()?)?.serve(make_svc);
        let addr = server.local_addr();
        let handle = tokio::spawn(async move {
            let _ = server.await;
        });
        Ok(Self {
            addr,
            requests,
            handle,
        })
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn candidates(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|(path, _)| path == "/candidate")
            .map(|(_, body)| body)
            .collect()
    }
}

impl Drop for RecordingPeer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}
