//! Session lifecycle states and the cell the worker publishes them through.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Connection lifecycle of a session.
///
/// The worker thread is the only writer; the foreground reads a published
/// snapshot and must never assume a transition happened until it observes it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl SessionState {
    pub fn is_connected(self) -> bool {
        self == SessionState::Connected
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionState::Disconnected => 0,
            SessionState::Connecting => 1,
            SessionState::Connected => 2,
            SessionState::Disconnecting => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            3 => SessionState::Disconnecting,
            _ => SessionState::Disconnected,
        }
    }
}

/// Lock-free publish/read cell for the session state.
///
/// Exactly one writer (the worker); any number of foreground readers.
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::Disconnected.as_u8()))
    }

    pub(crate) fn publish(&self, state: SessionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_starts_disconnected() {
        let cell = StateCell::new();
        assert_eq!(cell.load(), SessionState::Disconnected);
        assert!(!cell.load().is_connected());
    }

    #[test]
    fn cell_round_trips_every_state() {
        let cell = StateCell::new();
        for state in [
            SessionState::Connecting,
            SessionState::Connected,
            SessionState::Disconnecting,
            SessionState::Disconnected,
        ] {
            cell.publish(state);
            assert_eq!(cell.load(), state);
        }
    }

    #[test]
    fn only_connected_reports_connected() {
        assert!(SessionState::Connected.is_connected());
        assert!(!SessionState::Connecting.is_connected());
        assert!(!SessionState::Disconnecting.is_connected());
    }
}
