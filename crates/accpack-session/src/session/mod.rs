//! Shared session handle.
//!
//! Owns the single underlying session and serialises event fan-out to the
//! observers registered against it.

mod handle;
mod state;
mod types;

pub use handle::SessionHandle;
pub use types::{ConfigureError, ConnectionState, DispatchReport, RegistrationError, SessionStats};
