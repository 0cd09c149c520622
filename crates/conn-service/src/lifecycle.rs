//! Idle -> Booted -> Shutdown state machine with a one-shot cancel broadcast.

use conn_types::CancellationToken;
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const BOOTED: u8 = 1;
const SHUTDOWN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Booted,
    Shutdown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Idle => "idle",
            ServiceState::Booted => "booted",
            ServiceState::Shutdown => "shutdown",
        }
    }
}

pub(crate) struct Lifecycle {
    state: AtomicU8,
    canceler: CancellationToken,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            canceler: CancellationToken::new(),
        }
    }

    pub(crate) fn state(&self) -> ServiceState {
        match self.state.load(Ordering::Acquire) {
            IDLE => ServiceState::Idle,
            BOOTED => ServiceState::Booted,
            _ => ServiceState::Shutdown,
        }
    }

    /// Idle -> Booted. Returns false when already booted or shut down.
    pub(crate) fn boot(&self) -> bool {
        self.state
            .compare_exchange(IDLE, BOOTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Any -> Shutdown, cancelling the shared token on the first call only.
    pub(crate) fn shutdown(&self) -> bool {
        if self.state.swap(SHUTDOWN, Ordering::AcqRel) == SHUTDOWN {
            return false;
        }
        self.canceler.cancel();
        true
    }

    /// Token handed to every task-runner invocation. Never re-armed.
    pub(crate) fn canceler(&self) -> CancellationToken {
        self.canceler.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_then_shutdown() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), ServiceState::Idle);
        assert!(lc.boot());
        assert!(!lc.boot());
        assert_eq!(lc.state(), ServiceState::Booted);

        let token = lc.canceler();
        assert!(!token.is_cancelled());
        assert!(lc.shutdown());
        assert!(!lc.shutdown());
        assert_eq!(lc.state(), ServiceState::Shutdown);
        assert!(token.is_cancelled());
        assert!(lc.canceler().is_cancelled());
    }

    #[test]
    fn shutdown_is_terminal() {
        let lc = Lifecycle::new();
        assert!(lc.shutdown());
        assert!(!lc.boot());
        assert_eq!(lc.state(), ServiceState::Shutdown);
    }
}
