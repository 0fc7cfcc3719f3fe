//! Configuration management for the read-along engine
//!
//! Settings are layered from YAML/TOML files and `READALONG__`-prefixed
//! environment variables, then validated.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, CacheConfig, ObservabilityConfig, Settings, SyncConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
