//! Configuration resolution for accelerator packs.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/accpack/settings.json)
//! 3. Explicit config file supplied by the application
//! 4. Environment variables (highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::credentials::SessionConfig;
use crate::error::{Error, Result};

/// Complete accelerator-pack configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Raw session credentials as found in config layers.
///
/// Every field is optional here; `to_session_config` turns a complete set
/// into a validated [`SessionConfig`].
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl CredentialsConfig {
    /// Validate and convert into session credentials.
    pub fn to_session_config(&self) -> Result<SessionConfig> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(Error::MissingCredential { field: "api_key" })?;
        let session_id = self
            .session_id
            .as_deref()
            .ok_or(Error::MissingCredential {
                field: "session_id",
            })?;
        let token = self
            .token
            .as_deref()
            .ok_or(Error::MissingCredential { field: "token" })?;
        SessionConfig::new(api_key, session_id, token)
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_key", &self.api_key)
            .field("session_id", &self.session_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level applied to the accelerator-pack crates.
    pub level: String,
    /// Emit structured JSON log lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Default `RUST_LOG` filter derived from `level`.
    pub fn default_filter(&self) -> String {
        format!(
            "accpack_session={level},accpack_core={level}",
            level = self.level
        )
    }
}

/// Event dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Capacity of the channel feeding transport events into the session.
    pub forwarder_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            forwarder_capacity: 128,
        }
    }
}

impl Config {
    /// Reject values that cannot be used at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.forwarder_capacity == 0 {
            return Err(Error::Config(
                "dispatch.forwarder_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// One config file layer. Only fields present in the file are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    credentials: CredentialsConfig,
    logging: LoggingLayer,
    dispatch: DispatchLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DispatchLayer {
    forwarder_capacity: Option<usize>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(config_file: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    // Load global config
    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        let global = load_config_file(&global_path)?;
        merge_config(&mut config, global);
    }

    // Load explicit config
    if let Some(path) = config_file {
        let layer = load_config_file(path)?;
        merge_config(&mut config, layer);
    }

    apply_env_overrides(&mut config);

    config.validate()?;
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".accpack").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/accpack/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("accpack").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigLayer) {
    // Merge credentials
    if overlay.credentials.api_key.is_some() {
        base.credentials.api_key = overlay.credentials.api_key;
    }
    if overlay.credentials.session_id.is_some() {
        base.credentials.session_id = overlay.credentials.session_id;
    }
    if overlay.credentials.token.is_some() {
        base.credentials.token = overlay.credentials.token;
    }

    // Merge logging config
    if let Some(level) = overlay.logging.level {
        base.logging.level = level;
    }
    if let Some(json) = overlay.logging.json {
        base.logging.json = json;
    }

    // Merge dispatch config
    if let Some(capacity) = overlay.dispatch.forwarder_capacity {
        base.dispatch.forwarder_capacity = capacity;
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply `ACCPACK_*` overrides using `lookup` to read variables.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("ACCPACK_API_KEY") {
        config.credentials.api_key = Some(val);
    }
    if let Some(val) = lookup("ACCPACK_SESSION_ID") {
        config.credentials.session_id = Some(val);
    }
    if let Some(val) = lookup("ACCPACK_TOKEN") {
        config.credentials.token = Some(val);
    }
    if let Some(val) = lookup("ACCPACK_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("ACCPACK_LOG_JSON") {
        match parse_flag(&val) {
            Some(json) => config.logging.json = json,
            None => warn!(value = %val, "Ignoring invalid ACCPACK_LOG_JSON"),
        }
    }
    if let Some(val) = lookup("ACCPACK_FORWARDER_CAPACITY") {
        match val.parse() {
            Ok(n) => config.dispatch.forwarder_capacity = n,
            Err(_) => warn!(value = %val, "Ignoring invalid ACCPACK_FORWARDER_CAPACITY"),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
