use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use std::fmt;

/// The role a process plays in the offer/answer negotiation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Role::Offerer => "offerer",
            Role::Answerer => "answerer",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SdpType::Offer => "offer",
            SdpType::Pranswer => "pranswer",
            SdpType::Answer => "answer",
            SdpType::Rollback => "rollback",
        };
        write!(f, "{s}")
    }
}

/// A negotiated-media blob tagged with its offer/answer type.
///
/// Serialized as `{"type": "...", "sdp": "..."}`, the same JSON shape
/// browsers and webrtc stacks use, so it can be posted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::ErrMalformedDescription(e.to_string()))
    }
}

/// An opaque ICE candidate line, e.g.
/// `candidate:1 1 udp 2130706431 192.168.1.100 54321 typ host`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IceCandidate(String);

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self(candidate.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decodes the raw `/candidate` request body.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let candidate = std::str::from_utf8(body)
            .map_err(|e| Error::ErrMalformedCandidate(e.to_string()))?
            .trim();
        if candidate.is_empty() {
            return Err(Error::ErrMalformedCandidate("empty body".to_owned()));
        }
        Ok(Self(candidate.to_owned()))
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
