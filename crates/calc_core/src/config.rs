//! Runtime configuration resolved from the environment.
//!
//! | variable                     | default                          |
//! |------------------------------|----------------------------------|
//! | `CALC_DB_PATH`               | `<temp_dir>/calc_history.sqlite3`|
//! | `CALC_LOG_LEVEL`             | `debug` (debug) / `info` (release) |
//! | `CALC_LOG_DIR`               | unset: file logging disabled     |
//! | `CALC_ANON_HISTORY_CAPACITY` | `10`                             |

use crate::history::anonymous::DEFAULT_ANONYMOUS_CAPACITY;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CALC_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CALC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CALC_LOG_DIR";
pub const ENV_ANON_HISTORY_CAPACITY: &str = "CALC_ANON_HISTORY_CAPACITY";

const DEFAULT_DB_FILE_NAME: &str = "calc_history.sqlite3";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub anonymous_history_capacity: usize,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            anonymous_history_capacity: DEFAULT_ANONYMOUS_CAPACITY,
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidCapacity(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCapacity(raw) => write!(
                f,
                "{ENV_ANON_HISTORY_CAPACITY} must be a positive integer, got `{raw}`"
            ),
        }
    }
}

impl Error for ConfigError {}

impl CalcConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let anonymous_history_capacity = match read(ENV_ANON_HISTORY_CAPACITY) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err(ConfigError::InvalidCapacity(raw)),
            },
            None => defaults.anonymous_history_capacity,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            anonymous_history_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CalcConfig, ConfigError, ENV_ANON_HISTORY_CAPACITY, ENV_DB_PATH, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CalcConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CalcConfig::default());
        assert_eq!(config.anonymous_history_capacity, 10);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let config = CalcConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, " /var/lib/calc/db.sqlite3 "),
            (ENV_LOG_DIR, "   "),
            (ENV_ANON_HISTORY_CAPACITY, "25"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/calc/db.sqlite3"));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.anonymous_history_capacity, 25);
    }

    #[test]
    fn rejects_zero_or_garbage_capacity() {
        for raw in ["0", "ten", "-3"] {
            let err = CalcConfig::from_lookup(lookup(&[(ENV_ANON_HISTORY_CAPACITY, raw)]))
                .unwrap_err();
            assert_eq!(err, ConfigError::InvalidCapacity(raw.to_string()));
        }
    }
}
