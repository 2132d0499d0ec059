//! Process-wide shared session.
//!
//! Bootstrap code calls [`configure`] once with the session credentials;
//! every accelerator pack then registers against that same session.
//!
//! Re-configuration policy: calling [`configure`] again with identical
//! credentials returns the existing session; different credentials are
//! rejected with [`ConfigureError::AlreadyConfigured`] and the existing
//! session is left untouched.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use accpack_core::config::load_config;
use accpack_core::tracing_init::init_from_config;
use accpack_core::{Config, SessionConfig};

use crate::observer::{ObserverId, SessionObserver};
use crate::session::{ConfigureError, RegistrationError, SessionHandle};

static SHARED: RwLock<Option<Arc<SessionHandle>>> = parking_lot::const_rwlock(None);

/// Configure the shared session from raw credentials.
pub fn configure(
    api_key: impl Into<String>,
    session_id: impl Into<String>,
    token: impl Into<String>,
) -> Result<Arc<SessionHandle>, ConfigureError> {
    configure_with(SessionConfig::new(api_key, session_id, token)?)
}

/// Configure the shared session from validated credentials.
///
/// Concurrent callers are serialised; at most one session is ever built.
pub fn configure_with(config: SessionConfig) -> Result<Arc<SessionHandle>, ConfigureError> {
    let mut shared = SHARED.write();

    if let Some(existing) = shared.as_ref() {
        if existing.config() == &config {
            debug!(
                session_id = existing.session_id(),
                "Shared session already configured with these credentials"
            );
            return Ok(Arc::clone(existing));
        }
        warn!(
            session_id = existing.session_id(),
            requested = config.session_id(),
            "Rejected re-configuration of shared session"
        );
        return Err(ConfigureError::AlreadyConfigured {
            session_id: existing.session_id().to_string(),
        });
    }

    let handle = Arc::new(SessionHandle::new(config));
    *shared = Some(Arc::clone(&handle));
    drop(shared);

    info!(session_id = handle.session_id(), "Shared session configured");
    Ok(handle)
}

/// Configure the shared session from a resolved [`Config`].
///
/// The config is validated first; its credentials section must be complete.
pub fn configure_from(config: &Config) -> Result<Arc<SessionHandle>, ConfigureError> {
    config.validate()?;
    configure_with(config.credentials.to_session_config()?)
}

/// Application bootstrap: resolve config, install logging, configure the
/// shared session.
///
/// Config is layered as in [`load_config`], with `config_file` as the
/// explicit layer. An already installed tracing subscriber is kept. Returns
/// the config alongside the session so the caller can size its
/// [`event_forwarder`](SessionHandle::event_forwarder).
pub fn bootstrap(
    config_file: Option<&Path>,
) -> Result<(Config, Arc<SessionHandle>), ConfigureError> {
    let config = load_config(config_file)?;
    if let Err(e) = init_from_config(&config.logging) {
        debug!(error = %e, "Keeping existing tracing subscriber");
    }
    let session = configure_from(&config)?;
    Ok((config, session))
}

/// The shared session, if configured. Never creates one.
pub fn current() -> Option<Arc<SessionHandle>> {
    SHARED.read().clone()
}

/// Register an observer with the shared session.
pub fn register<O>(observer: &Arc<O>) -> Result<ObserverId, RegistrationError>
where
    O: SessionObserver + 'static,
{
    current()
        .ok_or(RegistrationError::NotConfigured)?
        .registry()
        .register(observer)
}

/// Register a type-erased observer with the shared session.
pub fn register_dyn(observer: &Arc<dyn SessionObserver>) -> Result<ObserverId, RegistrationError> {
    current()
        .ok_or(RegistrationError::NotConfigured)?
        .registry()
        .register_dyn(observer)
}

/// Deregister an observer from the shared session.
pub fn deregister<O: ?Sized>(observer: &Arc<O>) -> Result<(), RegistrationError> {
    current()
        .ok_or(RegistrationError::NotConfigured)?
        .registry()
        .deregister(observer)
}

/// Whether `observer` is registered with the shared session.
pub fn contains<O: ?Sized>(observer: &Arc<O>) -> bool {
    current().is_some_and(|session| session.registry().contains(observer))
}

/// Snapshot of the shared session's observers; empty when not configured.
pub fn registered_observers() -> Vec<Arc<dyn SessionObserver>> {
    current()
        .map(|session| session.registry().registered_observers())
        .unwrap_or_default()
}

/// Drop the shared session so the next test starts unconfigured.
#[cfg(any(test, feature = "test-utils"))]
pub fn reset() -> Option<Arc<SessionHandle>> {
    let previous = SHARED.write().take();
    if let Some(session) = &previous {
        debug!(session_id = session.session_id(), "Shared session reset");
    }
    previous
}
