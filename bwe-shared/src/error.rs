use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Signaling errors
    #[error("signaling: transport error: {0}")]
    ErrSignalingTransport(String),
    #[error("signaling: peer responded with status {0}")]
    ErrPeerStatus(u16),
    #[error("signaling: malformed session description: {0}")]
    ErrMalformedDescription(String),
    #[error("signaling: malformed candidate: {0}")]
    ErrMalformedCandidate(String),
    #[error("signaling: unexpected {0} description for this role")]
    ErrUnexpectedDescription(String),
    #[error("signaling: endpoint closed")]
    ErrEndpointClosed,

    //Transport collaborator errors
    #[error("transport: {0}")]
    ErrTransport(String),
    #[error("setup: {0}")]
    ErrSetup(String),

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("json: {0}")]
    Json(String),
    #[error("mutex poison: {0}")]
    PoisonError(String),
    #[error("{0}")]
    Std(#[source] StdError),
}

impl Error {
    pub fn from_std<T>(error: T) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        Error::Std(StdError(Box::new(error)))
    }

    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        if let Error::Std(s) = self {
            return s.0.downcast_ref();
        }

        None
    }
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

/// Preserves an error raised by a collaborator crate (hyper, webrtc, ...)
/// that has no dedicated variant here.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StdError(pub Box<dyn std::error::Error + Send + Sync>);

impl PartialEq for StdError {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_io_error_eq_by_kind() {
        let a = Error::from(io::Error::new(io::ErrorKind::NotFound, "a"));
        let b = Error::from(io::Error::new(io::ErrorKind::NotFound, "b"));
        let c = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "a"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_std_downcast() {
        let err = Error::from_std(io::Error::other("boom"));
        assert!(err.downcast_ref::<io::Error>().is_some());
        assert_eq!(err.to_string(), "boom");
    }
}
