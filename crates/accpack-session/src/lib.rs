//! Shared accelerator-pack session.
//!
//! One underlying session, created once from connection credentials, is
//! shared by independent accelerator packs (screen share, text chat,
//! annotation). Each pack registers as a [`SessionObserver`] and receives the
//! session's events until it deregisters:
//! - [`shared`] holds the process-wide session and its init-once guard
//! - [`SessionHandle`] owns the session state and serialises event fan-out
//! - [`ObserverRegistry`] tracks registered observers by identity

pub mod events;
pub mod observer;
pub mod registry;
pub mod session;
pub mod shared;

pub use accpack_core::SessionConfig;
pub use events::{Connection, SessionEvent, Signal, Stream, TransportError, VideoType};
pub use observer::{ObserverId, SessionObserver};
pub use registry::ObserverRegistry;
pub use session::{
    ConfigureError, ConnectionState, DispatchReport, RegistrationError, SessionHandle,
    SessionStats,
};
