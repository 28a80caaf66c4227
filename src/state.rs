//! Connection lifecycle state shared between a connection and its I/O loop.

use std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicU8, Ordering},
    },
};

use crate::error::FailureReason;

/// Lifecycle of a connection.
///
/// `Closed` and `Failed` are terminal: once reached, the state never changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No connection attempt has been made.
    Disconnected = 0,
    /// The socket is being opened.
    Connecting = 1,
    /// The socket is open and the I/O loop is running.
    Connected = 2,
    /// The connection was shut down locally or by the peer.
    Closed = 3,
    /// The I/O loop stopped on an unrecoverable error.
    Failed = 4,
}

impl ConnectionState {
    /// Returns `true` for `Closed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool { matches!(self, Self::Closed | Self::Failed) }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closed,
            _ => Self::Failed,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Atomic state cell plus the reason the I/O loop stopped, if it failed.
///
/// Cloning yields another handle to the same cell.
#[derive(Clone, Debug)]
pub(crate) struct SharedState {
    inner: Arc<StateInner>,
}

#[derive(Debug)]
struct StateInner {
    state: AtomicU8,
    failure: Mutex<Option<FailureReason>>,
}

impl SharedState {
    pub(crate) fn new(initial: ConnectionState) -> Self {
        Self {
            inner: Arc::new(StateInner {
                state: AtomicU8::new(initial as u8),
                failure: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Move to `next` unless a terminal state has already been reached.
    ///
    /// Returns the state that was replaced, or `None` when the transition was
    /// rejected.
    pub(crate) fn transition(&self, next: ConnectionState) -> Option<ConnectionState> {
        self.inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (!ConnectionState::from_u8(raw).is_terminal()).then_some(next as u8)
            })
            .ok()
            .map(ConnectionState::from_u8)
    }

    /// Record `reason` and move to `Failed`, unless already terminal.
    pub(crate) fn fail(&self, reason: FailureReason) -> bool {
        let mut failure = self
            .inner
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if self.transition(ConnectionState::Failed).is_none() {
            return false;
        }
        *failure = Some(reason);
        true
    }

    pub(crate) fn failure(&self) -> Option<FailureReason> {
        self.inner
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
