use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::state::ConnectionState;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    Continue,
    Terminate,
}

/// Turns connection state notifications into process lifecycle decisions.
///
/// Every transition is logged. `Failed` cancels the shared shutdown token,
/// after which the monitor reports `Terminate` for anything else it is told.
/// There is no ICE restart; one could be attempted here before giving up.
pub struct ConnectionLifecycleMonitor {
    state_tx: watch::Sender<ConnectionState>,
    terminated: AtomicBool,
    shutdown: CancellationToken,
}

impl ConnectionLifecycleMonitor {
    pub fn new(shutdown: CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::New);
        Self {
            state_tx,
            terminated: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Called from the transport's callback context; never blocks.
    pub fn on_state_change(&self, state: ConnectionState) -> LifecycleAction {
        if self.is_terminated() {
            debug!("connection state {state} after termination, ignored");
            return LifecycleAction::Terminate;
        }

        info!("Peer Connection State has changed: {state}");
        self.state_tx.send_replace(state);

        if state.is_terminal() {
            info!("Peer Connection has gone to failed exiting");
            self.terminated.store(true, Ordering::SeqCst);
            self.shutdown.cancel();
            return LifecycleAction::Terminate;
        }
        LifecycleAction::Continue
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Resolves once the connection is established. Returns `false` if
    /// shutdown came first.
    pub async fn wait_connected(&self) -> bool {
        let mut state_rx = self.subscribe();
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            res = state_rx.wait_for(|s| *s == ConnectionState::Connected) => res.is_ok(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_only_failed_terminates() {
        let shutdown = CancellationToken::new();
        let monitor = ConnectionLifecycleMonitor::new(shutdown.clone());

        for state in [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
            ConnectionState::Connected,
            ConnectionState::Closed,
        ] {
            assert_eq!(monitor.on_state_change(state), LifecycleAction::Continue);
            assert_eq!(monitor.state(), state);
        }
        assert!(!shutdown.is_cancelled());

        assert_eq!(
            monitor.on_state_change(ConnectionState::Failed),
            LifecycleAction::Terminate
        );
        assert!(shutdown.is_cancelled());
        assert!(monitor.is_terminated());
    }

    #[test]
    fn test_failed_is_final() {
        let monitor = ConnectionLifecycleMonitor::new(CancellationToken::new());
        monitor.on_state_change(ConnectionState::Failed);

        assert_eq!(
            monitor.on_state_change(ConnectionState::Connected),
            LifecycleAction::Terminate
        );
        assert_eq!(monitor.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_wait_connected() {
        let monitor = Arc::new(ConnectionLifecycleMonitor::new(CancellationToken::new()));

        let waiter = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.wait_connected().await })
        };
        monitor.on_state_change(ConnectionState::Connecting);
        monitor.on_state_change(ConnectionState::Connected);

        let connected = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(connected, Ok(Ok(true))));
    }

    #[tokio::test]
    async fn test_wait_connected_aborted_by_failure() {
        let monitor = Arc::new(ConnectionLifecycleMonitor::new(CancellationToken::new()));

        let waiter = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.wait_connected().await })
        };
        monitor.on_state_change(ConnectionState::Failed);

        let connected = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(connected, Ok(Ok(false))));
    }
}
