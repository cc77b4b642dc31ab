//! Configuration resolution for Parentic.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/parentic/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Parentic configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            database_path: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Completion provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider base URL, without the completions path.
    pub base_url: String,
    pub completions_path: String,
    /// Bearer credential. Never logged.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Bounds the connect phase only; streaming reads are not timed out.
    pub connect_timeout_secs: u64,
    /// Honour proxy settings from the environment.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            completions_path: "/chat/completions".to_string(),
            api_key: None,
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            connect_timeout_secs: 10,
            use_system_proxy: true,
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("completions_path", &self.completions_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("use_system_proxy", &self.use_system_proxy)
            .finish()
    }
}

impl UpstreamConfig {
    /// Full URL of the streaming completions endpoint.
    pub fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.completions_path.starts_with('/') {
            format!("{base}{}", self.completions_path)
        } else {
            format!("{base}/{}", self.completions_path)
        }
    }

    /// The configured credential, or a configuration error when absent or blank.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::Config(
                "Completion provider API key not configured".into(),
            )),
        }
    }
}

/// Relay behaviour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Capacity of the per-session downstream channel.
    pub channel_capacity: usize,
    /// Default number of turns returned by the history endpoint.
    pub history_default_limit: u32,
    /// Upper bound on the history endpoint `limit` parameter.
    pub history_max_limit: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            history_default_limit: 50,
            history_max_limit: 200,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(config_file: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_file {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
    }

    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(path) = config_file {
        let explicit = load_config_file(path)?;
        merge_config(&mut config, explicit);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".parentic").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/parentic/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("parentic").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    // Optional values only override when the overlay sets them.
    let database_path = overlay
        .server
        .database_path
        .clone()
        .or_else(|| base.server.database_path.take());
    base.server = overlay.server;
    base.server.database_path = database_path;

    let api_key = overlay
        .upstream
        .api_key
        .clone()
        .or_else(|| base.upstream.api_key.take());
    base.upstream = overlay.upstream;
    base.upstream.api_key = api_key;

    base.relay = overlay.relay;
}

/// Apply environment overrides using the given lookup.
///
/// `PARENTIC_API_KEY` takes precedence over the provider-specific
/// `DEEPSEEK_API_KEY`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("PARENTIC_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = lookup("PARENTIC_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("PARENTIC_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("PARENTIC_UPSTREAM_URL") {
        config.upstream.base_url = val;
    }
    if let Some(val) = lookup("PARENTIC_MODEL") {
        config.upstream.model = val;
    }
    if let Some(val) = lookup("PARENTIC_MAX_TOKENS") {
        if let Ok(n) = val.parse() {
            config.upstream.max_tokens = n;
        }
    }
    if let Some(val) = lookup("PARENTIC_API_KEY").or_else(|| lookup("DEEPSEEK_API_KEY")) {
        config.upstream.api_key = Some(val);
    }
}
