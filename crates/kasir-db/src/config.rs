//! Service configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                        | Default      |
//! |---------------------------------|--------------|
//! | `KASIR_DATABASE_PATH`           | `./kasir.db` |
//! | `KASIR_MAX_CONNECTIONS`         | `5`          |
//! | `KASIR_BUSY_TIMEOUT_MS`         | `5000`       |
//! | `KASIR_OPERATION_TIMEOUT_SECS`  | `10`         |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::CoordinatorConfig;
use crate::pool::DbConfig;

/// Kasir storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KasirConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// SQLite busy timeout
    pub busy_timeout: Duration,

    /// Default deadline for each coordinator operation
    pub operation_timeout: Duration,
}

impl KasirConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse_u64 = |name: &str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(name.to_string())),
            }
        };

        let database_path = lookup("KASIR_DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "./kasir.db".to_string());

        let max_connections = u32::try_from(parse_u64("KASIR_MAX_CONNECTIONS", 5)?)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidValue("KASIR_MAX_CONNECTIONS".to_string()))?;

        let busy_timeout = Duration::from_millis(parse_u64("KASIR_BUSY_TIMEOUT_MS", 5000)?);

        let operation_timeout_secs = parse_u64("KASIR_OPERATION_TIMEOUT_SECS", 10)?;
        if operation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "KASIR_OPERATION_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(KasirConfig {
            database_path: PathBuf::from(database_path),
            max_connections,
            busy_timeout,
            operation_timeout: Duration::from_secs(operation_timeout_secs),
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(self.busy_timeout)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            operation_timeout: self.operation_timeout,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<KasirConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        KasirConfig::load_from(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./kasir.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("KASIR_DATABASE_PATH", "/var/lib/kasir/kasir.db"),
            ("KASIR_MAX_CONNECTIONS", "8"),
            ("KASIR_OPERATION_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.db_config().max_connections, 8);
        assert_eq!(
            config.coordinator_config().operation_timeout,
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("KASIR_MAX_CONNECTIONS", "lots")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for KASIR_MAX_CONNECTIONS");

        assert!(load(&[("KASIR_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("KASIR_OPERATION_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("KASIR_BUSY_TIMEOUT_MS", "-1")]).is_err());
    }
}
