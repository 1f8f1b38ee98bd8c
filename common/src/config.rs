//! Configuration loading.
//!
//! Runtime settings come from environment variables; the list of monitored
//! servers comes from a TOML target file with one table per target:
//!
//! ```toml
//! [db1]
//! hostname = "10.0.0.5"   # optional, defaults to the table name
//! port = 3306             # optional
//! username = "monitor"
//! password = "secret"
//!
//! ["replica.example.com"]  # names containing dots must be quoted
//! username = "monitor"
//! password = "secret"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::{Target, MYSQL_PORT};

/// Runtime settings of the monitor.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and response metadata.
    pub service: String,
    /// HTTP listen host.
    pub host: String,
    /// HTTP listen port.
    pub port: u16,
    /// Path of the target file.
    pub targets_file: PathBuf,
    /// Schema opened on connect.
    pub database: String,
    /// Delay between sampler cycles.
    pub poll_interval_secs: u64,
    /// Delay between failed connection attempts.
    pub retry_backoff_secs: u64,
    /// Period of the unconditional view refresh.
    pub refresh_interval_secs: u64,
    /// Upper bound on one connection attempt.
    pub connect_timeout_secs: u64,
    /// Number of log entries kept for display.
    pub log_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: "mmtop".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8090,
            targets_file: PathBuf::from("mmtop.toml"),
            database: "mysql".to_string(),
            poll_interval_secs: 5,
            retry_backoff_secs: 5,
            refresh_interval_secs: 5,
            connect_timeout_secs: 10,
            log_capacity: 4,
        }
    }
}

impl AppConfig {
    /// Loads settings from the environment, falling back to defaults for
    /// missing or unparsable values.
    pub fn load_with_service(service: &str) -> Self {
        let defaults = Self::default();
        Self {
            service: service.to_string(),
            host: env_or("SERVER_HOST", defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            targets_file: env_or("MMTOP_CONFIG", defaults.targets_file),
            database: env_or("MMTOP_DATABASE", defaults.database),
            poll_interval_secs: env_or("MMTOP_POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            retry_backoff_secs: env_or("MMTOP_RETRY_BACKOFF_SECS", defaults.retry_backoff_secs),
            refresh_interval_secs: env_or(
                "MMTOP_REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            ),
            connect_timeout_secs: env_or(
                "MMTOP_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            log_capacity: env_or("MMTOP_LOG_CAPACITY", defaults.log_capacity).max(1),
        }
    }

    // Durations below one second are raised to one.

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

/// One table of the target file.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct TargetEntry {
    hostname: Option<String>,
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    port: Option<u16>,
    #[validate(length(min = 1, message = "username must not be empty"))]
    username: String,
    password: String,
}

/// Reads and parses the target file.
pub fn load_targets(path: &Path) -> AppResult<Vec<Target>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_targets(&raw)
}

/// Parses target definitions, keeping file order.
pub fn parse_targets(raw: &str) -> AppResult<Vec<Target>> {
    let table: toml::Table = raw
        .parse()
        .map_err(|e: toml::de::Error| AppError::Config(e.to_string()))?;

    let mut targets = Vec::with_capacity(table.len());
    for (name, value) in table {
        let Some(fields) = value.as_table() else {
            return Err(AppError::Config(format!(
                "`{}` must be a table describing a target",
                name
            )));
        };
        // A bare dotted header like [db1.example.com] nests tables.
        if !fields.is_empty() && fields.values().all(toml::Value::is_table) {
            return Err(AppError::Config(format!(
                "[{}] holds only sub-tables; quote target names containing dots, e.g. [\"{}.{}\"]",
                name,
                name,
                fields.keys().next().map(String::as_str).unwrap_or_default()
            )));
        }
        let entry: TargetEntry = value
            .try_into()
            .map_err(|e: toml::de::Error| AppError::Config(format!("[{}]: {}", name, e)))?;
        entry
            .validate()
            .map_err(|e| AppError::Validation(format!("[{}]: {}", name, e)))?;

        targets.push(Target {
            address: entry.hostname.unwrap_or_else(|| name.clone()),
            port: entry.port.unwrap_or(MYSQL_PORT),
            username: entry.username,
            password: entry.password,
            name,
        });
    }

    if targets.is_empty() {
        return Err(AppError::Config("no targets configured".into()));
    }
    Ok(targets)
}
