//! TOML configuration for the client.
//!
//! Read from `--config PATH` when given, otherwise from the platform config
//! file:
//! - Linux:    `$XDG_CONFIG_HOME/replwire/config.toml` or `~/.config/replwire/config.toml`
//! - macOS:    `~/Library/Application Support/replwire/config.toml`
//! - Windows:  `%APPDATA%\replwire\config.toml`
//!
//! ```toml
//! [connection]
//! host = "localhost"
//! port = 11211
//! chunk_size = 1024
//!
//! [input]
//! mode = "balanced"
//! prompt = "--> "
//!
//! [logging]
//! level = "info"
//! file = "/tmp/replwire.log"
//! ```
//!
//! Every field has a default, so a partial file (or none at all) is valid.
//! Command-line flags are applied on top by `main`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::compose_input::InputMode;
use crate::infrastructure::network::MAX_CHUNK_SIZE;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `--config` was given and the platform config directory could not
    /// be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `chunk_size` is zero or larger than [`MAX_CHUNK_SIZE`].
    #[error("chunk_size must be between 1 and {MAX_CHUNK_SIZE} bytes")]
    InvalidChunkSize,
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub input: InputSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Where to connect and how much to move per I/O call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Most bytes per read or write call.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// How typed input becomes messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSection {
    #[serde(default)]
    pub mode: InputMode,
    /// Printed before each fresh unit when stdin is a terminal.  Empty
    /// disables it.
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

/// `tracing` output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"replwire_client=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file; logs go to stderr when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    11211
}
fn default_chunk_size() -> usize {
    1024
}
fn default_prompt() -> String {
    "--> ".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            mode: InputMode::default(),
            prompt: default_prompt(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Checks values serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidChunkSize`] unless `chunk_size` is in
    /// `1..=MAX_CHUNK_SIZE`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CHUNK_SIZE).contains(&self.connection.chunk_size) {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Resolves the platform config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the configuration.
///
/// With `explicit = Some(path)` the file must exist.  Without it, the
/// platform file is used if present and defaults otherwise; a platform
/// without a config directory also gets defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors, [`ConfigError::Parse`]
/// if the TOML is malformed, and [`ConfigError::InvalidChunkSize`] if the
/// loaded values fail validation.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let cfg = match explicit {
        Some(path) => read_config(path)?,
        None => match config_file_path() {
            Ok(path) => match read_config(&path) {
                Err(ConfigError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!(path = %path.display(), "no config file; using defaults");
                    AppConfig::default()
                }
                other => other?,
            },
            Err(ConfigError::NoPlatformConfigDir) => AppConfig::default(),
            Err(e) => return Err(e),
        },
    };
    cfg.validate()?;
    Ok(cfg)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(toml::from_str(&content)?)
}

/// Resolves the platform config directory including the `replwire` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("replwire"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("replwire")
        })
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("replwire"))
    }

    #[cfg(not(any(unix, target_os = "windows")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
