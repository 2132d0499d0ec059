//! Observer capability implemented by accelerator packs.

use std::fmt;
use std::sync::Arc;

use crate::events::{Connection, SessionEvent, Signal, Stream, TransportError};

/// Receives events from the shared session.
///
/// Every callback defaults to a no-op, so a pack implements only the events
/// it cares about. Callbacks run on the publishing thread and must return
/// quickly; they may register or deregister observers, including themselves.
pub trait SessionObserver: Send + Sync {
    fn on_connected(&self, _connection: &Connection) {}

    fn on_disconnected(&self) {}

    fn on_stream_created(&self, _stream: &Stream) {}

    fn on_stream_destroyed(&self, _stream: &Stream) {}

    fn on_connection_created(&self, _connection: &Connection) {}

    fn on_connection_destroyed(&self, _connection: &Connection) {}

    fn on_signal(&self, _signal: &Signal) {}

    fn on_reconnecting(&self) {}

    fn on_reconnected(&self) {}

    fn on_error(&self, _error: &TransportError) {}

    /// Route an event to its callback. Override to see every event as one.
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected(connection) => self.on_connected(connection),
            SessionEvent::Disconnected => self.on_disconnected(),
            SessionEvent::StreamCreated(stream) => self.on_stream_created(stream),
            SessionEvent::StreamDestroyed(stream) => self.on_stream_destroyed(stream),
            SessionEvent::ConnectionCreated(connection) => self.on_connection_created(connection),
            SessionEvent::ConnectionDestroyed(connection) => {
                self.on_connection_destroyed(connection);
            }
            SessionEvent::SignalReceived(signal) => self.on_signal(signal),
            SessionEvent::Reconnecting => self.on_reconnecting(),
            SessionEvent::Reconnected => self.on_reconnected(),
            SessionEvent::Error(error) => self.on_error(error),
        }
    }
}

/// Identity of a registered observer: the address of its `Arc` allocation.
///
/// Two handles to the same observer share an id; two equal-looking observers
/// in separate allocations never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(usize);

impl ObserverId {
    pub fn of<O: ?Sized>(observer: &Arc<O>) -> Self {
        Self(Arc::as_ptr(observer).cast::<()>().addr())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{:#x}", self.0)
    }
}
