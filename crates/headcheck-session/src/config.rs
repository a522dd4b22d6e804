use std::path::{Path, PathBuf};
use std::time::Duration;

use headcheck_core::{Locale, DEFAULT_TURN_THRESHOLD};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session configuration.
///
/// Loaded from an optional TOML file, then overridden by `HEADCHECK_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Period between detection cycles while the camera is active.
    pub poll_interval_ms: u64,
    /// Delay between camera start and the first detection cycle.
    pub start_delay_ms: u64,
    /// Offset (landmark pixels) beyond which a head counts as turned.
    pub turn_threshold: f32,
    /// Language of the status messages.
    pub locale: Locale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            start_delay_ms: 300,
            turn_threshold: DEFAULT_TURN_THRESHOLD,
            locale: Locale::En,
        }
    }
}

impl Config {
    /// Defaults overridden by `HEADCHECK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored with a
    /// warning and the current value is kept.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.poll_interval_ms = parsed(&lookup, "HEADCHECK_POLL_INTERVAL_MS", self.poll_interval_ms);
        self.start_delay_ms = parsed(&lookup, "HEADCHECK_START_DELAY_MS", self.start_delay_ms);
        self.turn_threshold = parsed(&lookup, "HEADCHECK_TURN_THRESHOLD", self.turn_threshold);
        self.locale = parsed(&lookup, "HEADCHECK_LOCALE", self.locale);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.turn_threshold.is_finite() || self.turn_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "turn_threshold must be a non-negative number, got {}",
                self.turn_threshold
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: T,
) -> T {
    match lookup(key) {
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable config override");
                current
            }
        },
        None => current,
    }
}
