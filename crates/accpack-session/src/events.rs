//! Session events produced by the transport.
//!
//! The transport owns the payloads; this crate only carries them from the
//! session to every registered observer.

/// A participant connection in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub connection_id: String,
    /// Application data attached to the connection token.
    pub data: Option<String>,
}

/// Source of a stream's video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoType {
    #[default]
    Camera,
    Screen,
}

/// A published media stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub stream_id: String,
    /// Connection that published the stream.
    pub connection_id: String,
    pub name: Option<String>,
    pub video_type: VideoType,
    pub has_audio: bool,
    pub has_video: bool,
}

/// A signal sent between participants (chat messages, annotation strokes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Signal type, used by packs to pick out their own traffic.
    pub kind: Option<String>,
    pub data: String,
    pub from_connection: Option<String>,
}

/// Transport-level failure reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub code: i32,
    pub message: String,
}

/// Events emitted by the underlying session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// This client connected; carries its own connection.
    Connected(Connection),
    Disconnected,
    StreamCreated(Stream),
    StreamDestroyed(Stream),
    ConnectionCreated(Connection),
    ConnectionDestroyed(Connection),
    SignalReceived(Signal),
    Reconnecting,
    Reconnected,
    Error(TransportError),
}

impl SessionEvent {
    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Disconnected => "disconnected",
            Self::StreamCreated(_) => "stream_created",
            Self::StreamDestroyed(_) => "stream_destroyed",
            Self::ConnectionCreated(_) => "connection_created",
            Self::ConnectionDestroyed(_) => "connection_destroyed",
            Self::SignalReceived(_) => "signal_received",
            Self::Reconnecting => "reconnecting",
            Self::Reconnected => "reconnected",
            Self::Error(_) => "error",
        }
    }
}
