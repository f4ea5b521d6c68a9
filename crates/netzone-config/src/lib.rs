//! Configuration for the netzone server and CLI.
//!
//! One TOML file (platform config dir, or `--config`), overridden by
//! `NETZONE_*` environment variables with `__` between nested keys, e.g.
//! `NETZONE_SERVER__READ_ONLY=true`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "NETZONE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("cannot encode config as TOML: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("cannot load config: {0}")]
    Figment(Box<figment::Error>),

    #[error("cannot write config: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Sections ────────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Refuse every mapping, policy, zone and device mutation.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            read_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Mapping document (JSON).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Debounce between a mapping change and the flush to disk. The server
    /// also re-reads the file this often to pick up CLI edits.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_store_path() -> PathBuf {
    ProjectDirs::from("com", "netzone", "netzone").map_or_else(
        || PathBuf::from("mappings.json"),
        |dirs| dirs.data_dir().join("mappings.json"),
    )
}
fn default_flush_interval() -> u64 {
    2
}
fn default_workers() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_level() -> String {
    "info".into()
}

impl Config {
    /// Parsed `server.listen`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "server.listen".into(),
                reason: format!("not a socket address: {}", self.server.listen),
            })
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.store.flush_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.store.flush_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "store.flush_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.ingest.workers == 0 {
            return Err(ConfigError::Validation {
                field: "ingest.workers".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.ingest.queue_capacity == 0 {
            return Err(ConfigError::Validation {
                field: "ingest.queue_capacity".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// Platform config dir (`~/.config/netzone/config.toml` on Linux).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "netzone", "netzone").map_or_else(
        || {
            let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
            home.join(".config").join("netzone").join("config.toml")
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Load / save ─────────────────────────────────────────────────────

/// Load defaults, then the TOML file (if present), then `NETZONE_*`
/// environment overrides, and validate the result.
///
/// `path` replaces the platform config path.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Serialize config to TOML and write it, returning the path written.
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}
