use std::fmt;

/// Overall state of the peer connection, as reported by the transport.
///
/// Typical progression for a successful connection:
///
/// ```text
/// New → Connecting → Connected
/// ```
///
/// If problems occur:
///
/// ```text
/// Connected → Disconnected → (may recover to Connected)
/// Connected → Failed (permanent failure)
/// Any state → Closed (connection closed)
/// ```
///
/// Only `Failed` ends the process; `Disconnected` may recover on its own.
///
/// ```
/// use bwe_control::ConnectionState;
///
/// let state = ConnectionState::Connected;
/// assert_eq!(state.to_string(), "connected");
///
/// let parsed: ConnectionState = "failed".into();
/// assert!(parsed.is_terminal());
/// assert!(!ConnectionState::Disconnected.is_terminal());
/// ```
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// State not specified. This should not occur in normal operation.
    #[default]
    Unspecified,

    /// Connection is in initial state.
    New,

    /// ICE connectivity checks and/or the DTLS handshake are running.
    Connecting,

    /// ICE and DTLS are established and media can flow.
    Connected,

    /// Connectivity was lost. The transport may still recover.
    Disconnected,

    /// Connection has permanently failed.
    Failed,

    /// Connection has been closed.
    Closed,
}

const UNSPECIFIED_STR: &str = "Unspecified";
const CONNECTION_STATE_NEW_STR: &str = "new";
const CONNECTION_STATE_CONNECTING_STR: &str = "connecting";
const CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const CONNECTION_STATE_FAILED_STR: &str = "failed";
const CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        *self == ConnectionState::Failed
    }
}

impl From<&str> for ConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            CONNECTION_STATE_NEW_STR => ConnectionState::New,
            CONNECTION_STATE_CONNECTING_STR => ConnectionState::Connecting,
            CONNECTION_STATE_CONNECTED_STR => ConnectionState::Connected,
            CONNECTION_STATE_DISCONNECTED_STR => ConnectionState::Disconnected,
            CONNECTION_STATE_FAILED_STR => ConnectionState::Failed,
            CONNECTION_STATE_CLOSED_STR => ConnectionState::Closed,
            _ => ConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConnectionState::New => CONNECTION_STATE_NEW_STR,
            ConnectionState::Connecting => CONNECTION_STATE_CONNECTING_STR,
            ConnectionState::Connected => CONNECTION_STATE_CONNECTED_STR,
            ConnectionState::Disconnected => CONNECTION_STATE_DISCONNECTED_STR,
            ConnectionState::Failed => CONNECTION_STATE_FAILED_STR,
            ConnectionState::Closed => CONNECTION_STATE_CLOSED_STR,
            ConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_connection_state() {
        let tests = vec![
            (UNSPECIFIED_STR, ConnectionState::Unspecified),
            ("new", ConnectionState::New),
            ("connecting", ConnectionState::Connecting),
            ("connected", ConnectionState::Connected),
            ("disconnected", ConnectionState::Disconnected),
            ("failed", ConnectionState::Failed),
            ("closed", ConnectionState::Closed),
        ];

        for (state_string, expected_state) in tests {
            assert_eq!(
                ConnectionState::from(state_string),
                expected_state,
                "testCase: {expected_state}",
            );
        }
    }

    #[test]
    fn test_connection_state_string() {
        let tests = vec![
            (ConnectionState::Unspecified, UNSPECIFIED_STR),
            (ConnectionState::New, "new"),
            (ConnectionState::Connecting, "connecting"),
            (ConnectionState::Connected, "connected"),
            (ConnectionState::Disconnected, "disconnected"),
            (ConnectionState::Failed, "failed"),
            (ConnectionState::Closed, "closed"),
        ];

        for (state, expected_string) in tests {
            assert_eq!(state.to_string(), expected_string)
        }
    }
}
