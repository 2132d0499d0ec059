//! Accelerator-pack core library.
//!
//! Shared functionality for the accelerator-pack crates:
//! - Session credentials and their validation
//! - Configuration resolution and hierarchy
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod credentials;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use credentials::SessionConfig;
pub use error::{Error, Result};
