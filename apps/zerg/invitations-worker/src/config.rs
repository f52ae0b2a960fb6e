//! Worker settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | required |
//! | `REDIS_URL` | `redis://127.0.0.1:6379` |
//! | `INVITATIONS_WORKER_CONSUMER_ID` | random `worker-xxxxxxxx` |
//! | `INVITATIONS_WORKER_BLOCK_MS` | `1000` |
//! | `INVITATIONS_WORKER_BATCH_SIZE` | `10` |
//! | `INVITATIONS_WORKER_HEALTH_PORT`, then `HEALTH_PORT` | `8083` |
//! | `LOG_FORMAT` (`json` or `pretty`) | `json` when `APP_ENV=production` |

use std::env;
use std::str::FromStr;
use strum::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per line, for log shippers
    Json,
    Pretty,
}

impl LogFormat {
    /// Directives used when `RUST_LOG` is unset.
    pub fn default_filter(self) -> &'static str {
        match self {
            LogFormat::Json => "info,sea_orm=warn,sqlx=warn",
            LogFormat::Pretty => "debug,sea_orm=info,sqlx=info",
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkerSettings {
    pub database_url: String,
    pub redis_url: String,
    /// Consumer name inside the `invitation_workers` group
    pub consumer_id: String,
    /// How long one XREADGROUP blocks waiting for jobs
    pub block_ms: u64,
    pub batch_size: usize,
    pub health_port: u16,
    pub log_format: LogFormat,
}

impl WorkerSettings {
    pub const DEFAULT_REDIS_URL: &'static str = "redis://127.0.0.1:6379";
    pub const DEFAULT_BLOCK_MS: u64 = 1000;
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_HEALTH_PORT: u16 = 8083;

    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port_key = if var("INVITATIONS_WORKER_HEALTH_PORT").is_some() {
            "INVITATIONS_WORKER_HEALTH_PORT"
        } else {
            "HEALTH_PORT"
        };
        let health_port = parsed(port_key, Self::DEFAULT_HEALTH_PORT)?;

        let batch_size = parsed("INVITATIONS_WORKER_BATCH_SIZE", Self::DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "INVITATIONS_WORKER_BATCH_SIZE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url,
            redis_url: var("REDIS_URL").unwrap_or_else(|| Self::DEFAULT_REDIS_URL.to_string()),
            consumer_id: var("INVITATIONS_WORKER_CONSUMER_ID").unwrap_or_else(random_consumer_id),
            block_ms: parsed("INVITATIONS_WORKER_BLOCK_MS", Self::DEFAULT_BLOCK_MS)?,
            batch_size,
            health_port,
            log_format: log_format()?,
        })
    }
}

/// Non-empty, trimmed value of `key`.
fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn log_format() -> Result<LogFormat, ConfigError> {
    if var("LOG_FORMAT").is_some() {
        return parsed("LOG_FORMAT", LogFormat::Pretty);
    }

    let production = var("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
    Ok(if production {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    })
}

fn random_consumer_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("worker-{}", &id[..8])
}
