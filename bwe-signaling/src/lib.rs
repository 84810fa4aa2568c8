//! Out-of-band signaling between an offering and an answering process.
//!
//! Each process hosts a small HTTP server accepting `POST /sdp` and
//! `POST /candidate`, and posts its own description and candidates to the
//! peer's server. Local candidates discovered before the remote description
//! is applied are held back in a [`CandidateBuffer`] and flushed, in
//! discovery order, once it is.

#![warn(rust_2018_idioms)]

pub mod candidate;
pub mod client;
pub mod description;
pub mod endpoint;
pub mod server;
pub mod transport;

pub use candidate::{CandidateBuffer, Disposition};
pub use client::SignalingClient;
pub use description::{IceCandidate, Role, SdpType, SessionDescription};
pub use endpoint::SignalingEndpoint;
pub use transport::PeerTransport;
