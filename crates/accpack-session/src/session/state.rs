//! Session state derived from published events.

use std::collections::BTreeMap;

use crate::events::{Connection, SessionEvent, Stream};

use super::types::ConnectionState;

/// Live state of the underlying session.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub connection_state: ConnectionState,
    /// This client's own connection, once connected.
    pub connection: Option<Connection>,
    /// Active streams keyed by stream id.
    pub streams: BTreeMap<String, Stream>,
    /// Event sequence counter.
    sequence: u64,
}

impl SessionState {
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub const fn events_published(&self) -> u64 {
        self.sequence
    }

    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected(connection) => {
                self.connection_state = ConnectionState::Connected;
                self.connection = Some(connection.clone());
            }
            SessionEvent::Disconnected => {
                self.connection_state = ConnectionState::Disconnected;
                self.connection = None;
                self.streams.clear();
            }
            SessionEvent::Reconnecting => {
                self.connection_state = ConnectionState::Reconnecting;
            }
            SessionEvent::Reconnected => {
                self.connection_state = ConnectionState::Connected;
            }
            SessionEvent::StreamCreated(stream) => {
                self.streams
                    .insert(stream.stream_id.clone(), stream.clone());
            }
            SessionEvent::StreamDestroyed(stream) => {
                self.streams.remove(&stream.stream_id);
            }
            SessionEvent::ConnectionDestroyed(connection) => {
                self.streams
                    .retain(|_, s| s.connection_id != connection.connection_id);
            }
            SessionEvent::ConnectionCreated(_)
            | SessionEvent::SignalReceived(_)
            | SessionEvent::Error(_) => {}
        }
    }
}
