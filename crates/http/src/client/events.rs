//! Session lifecycle events emitted by the gateway

use tokio::sync::broadcast;

/// Why the gateway ended the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// A request was rejected and there was no refresh token to recover with
    MissingRefreshToken,
    /// The refresh endpoint rejected the refresh token or could not be reached
    RefreshRejected,
}

/// Event published after the gateway has logged the session out
///
/// The application layer subscribes and decides where to navigate; the
/// gateway itself knows nothing about routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Invalidated { reason: InvalidationReason },
}

pub(crate) const EVENT_CAPACITY: usize = 16;

pub(crate) fn channel() -> broadcast::Sender<SessionEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}
