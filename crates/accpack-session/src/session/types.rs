//! Shared session types.

use crate::observer::ObserverId;

/// Connection status of the underlying session, as reported by its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Reconnecting,
}

/// Outcome of publishing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sequence number assigned to the event (first event is 1).
    pub sequence: u64,
    /// Number of observers the event was delivered to.
    pub delivered: usize,
    /// Published from inside a callback; delivered after the event that was
    /// in flight, so `delivered` is 0.
    pub deferred: bool,
}

/// Session statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Live registered observers.
    pub observer_count: usize,
    /// Events published since the session was created.
    pub events_published: u64,
    /// Streams currently active in the session.
    pub active_streams: usize,
    pub connection_state: ConnectionState,
}

/// Observer registration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Shared session is not configured")]
    NotConfigured,

    #[error("Observer already registered: {observer}")]
    AlreadyRegistered { observer: ObserverId },

    #[error("Observer not registered: {observer}")]
    NotRegistered { observer: ObserverId },
}

/// Shared session configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigureError {
    #[error("Invalid session configuration: {0}")]
    Invalid(#[from] accpack_core::Error),

    #[error("Shared session already configured for session {session_id}")]
    AlreadyConfigured { session_id: String },
}
