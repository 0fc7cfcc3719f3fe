//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::ConfigError;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Sync engine configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Audio segment cache limits
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Drift beyond which the engine snaps to the clock (ms)
    #[serde(default = "default_drift_threshold_ms")]
    pub drift_threshold_ms: f64,

    /// Ticker period (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Clip/word-timeline mismatch tolerated before rescaling words (ms)
    #[serde(default = "default_word_rescale_tolerance_ms")]
    pub word_rescale_tolerance_ms: f64,

    /// Speaking rate used for duration estimates
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: f64,
}

fn default_drift_threshold_ms() -> f64 {
    constants::sync::DRIFT_THRESHOLD_MS
}
fn default_tick_interval_ms() -> u64 {
    constants::sync::TICK_INTERVAL_MS
}
fn default_word_rescale_tolerance_ms() -> f64 {
    constants::sync::WORD_RESCALE_TOLERANCE_MS
}
fn default_words_per_minute() -> f64 {
    constants::sync::WORDS_PER_MINUTE
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_threshold_ms: default_drift_threshold_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            word_rescale_tolerance_ms: default_word_rescale_tolerance_ms(),
            words_per_minute: default_words_per_minute(),
        }
    }
}

impl SyncConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.drift_threshold_ms > 0.0) {
            return Err(invalid("sync.drift_threshold_ms", "must be positive"));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("sync.tick_interval_ms", "must be at least 1ms"));
        }
        if !(self.word_rescale_tolerance_ms >= 0.0) {
            return Err(invalid("sync.word_rescale_tolerance_ms", "must not be negative"));
        }
        if !(self.words_per_minute > 0.0) {
            return Err(invalid("sync.words_per_minute", "must be positive"));
        }
        Ok(())
    }
}

/// Audio segment cache limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached segments
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum total audio bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Segments older than this are treated as absent
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_max_entries() -> usize {
    constants::cache::MAX_ENTRIES
}
fn default_max_bytes() -> u64 {
    constants::cache::MAX_BYTES
}
fn default_max_age_secs() -> u64 {
    constants::cache::MAX_AGE_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_bytes: default_max_bytes(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(invalid("cache.max_entries", "must be at least 1"));
        }
        if self.max_bytes == 0 {
            return Err(invalid("cache.max_bytes", "must be at least 1"));
        }
        Ok(())
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (READALONG__ prefix, `__` separator)
/// 2. config/{env}.(yaml|toml) (if env specified)
/// 3. config/default.(yaml|toml)
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Same as [`load_settings`], reading files from `dir`
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(
        File::with_name(&dir.join("default").to_string_lossy()).required(false),
    );

    if let Some(env_name) = env {
        builder = builder.add_source(
            File::with_name(&dir.join(env_name).to_string_lossy()).required(false),
        );
    }

    builder = builder.add_source(
        Environment::with_prefix("READALONG")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;
    tracing::debug!(?settings, "Loaded settings");

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.sync.drift_threshold_ms, 200.0);
        assert_eq!(settings.sync.tick_interval_ms, 16);
        assert_eq!(settings.cache.max_entries, 50);
        assert_eq!(settings.cache.max_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.cache.max_age(), Duration::from_secs(1800));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.cache.max_entries = 0;
        assert!(settings.validate().is_err());

        settings.cache.max_entries = 10;
        settings.sync.drift_threshold_ms = 0.0;
        assert!(settings.validate().is_err());

        settings.sync.drift_threshold_ms = 150.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.yaml"),
            "cache:\n  max_entries: 20\nsync:\n  drift_threshold_ms: 250\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("test.yaml"),
            "cache:\n  max_age_secs: 60\n",
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), Some("test")).unwrap();
        assert_eq!(settings.cache.max_entries, 20);
        assert_eq!(settings.cache.max_age_secs, 60);
        assert_eq!(settings.cache.max_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.sync.drift_threshold_ms, 250.0);
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.cache.max_entries, 50);
        assert_eq!(settings.observability.log_level, "info");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.yaml"), "cache:\n  max_bytes: 0\n").unwrap();

        let result = load_settings_from(dir.path(), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
