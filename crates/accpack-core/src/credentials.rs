//! Session credentials.
//!
//! A `SessionConfig` identifies the one shared session every accelerator
//! pack joins. It is validated on construction and immutable afterwards.

use std::fmt;

use crate::error::{Error, Result};

/// Validated credentials for the shared session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfig {
    api_key: String,
    session_id: String,
    token: String,
}

impl SessionConfig {
    /// Build credentials, rejecting blank fields.
    ///
    /// Fields are checked in order `api_key`, `session_id`, `token`; the first
    /// blank one is reported.
    pub fn new(
        api_key: impl Into<String>,
        session_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let session_id = session_id.into();
        let token = token.into();

        for (field, value) in [
            ("api_key", &api_key),
            ("session_id", &session_id),
            ("token", &token),
        ] {
            if value.trim().is_empty() {
                return Err(Error::EmptyCredential { field });
            }
        }

        Ok(Self {
            api_key,
            session_id,
            token,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Connection token. Never log this.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &self.api_key)
            .field("session_id", &self.session_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
