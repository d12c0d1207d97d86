//! Storage infrastructure: the configuration file.
//!
//! The `config` sub-module reads the TOML configuration from an explicit
//! path or the platform config directory, falls back to defaults when no
//! file exists yet, and can render the effective configuration back to TOML.

pub mod config;
