//! Environment-driven store configuration.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `LEARNHUB_STORE` | `memory` | `memory` or `postgres` |
//! | `DATABASE_URL` | (required for postgres) | Postgres connection string |
//! | `DATABASE_MAX_CONNECTIONS` | `10` | pool size |
//! | `DATABASE_ACQUIRE_TIMEOUT_SECS` | `5` | pool acquire timeout |

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::store::{InMemoryLearningStore, PostgresLearningStore, SharedStore, StoreError};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Postgres(PostgresConfig),
}

impl StoreConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup` (variable name to value).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("LEARNHUB_STORE").unwrap_or_else(|| "memory".to_string());

        match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreConfig::Memory),
            "postgres" => {
                let url = lookup("DATABASE_URL")
                    .filter(|url| !url.trim().is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;

                let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                    Some(raw) => parse_positive("DATABASE_MAX_CONNECTIONS", &raw)?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                let acquire_timeout = match lookup("DATABASE_ACQUIRE_TIMEOUT_SECS") {
                    Some(raw) => Duration::from_secs(
                        parse_positive("DATABASE_ACQUIRE_TIMEOUT_SECS", &raw)?.into(),
                    ),
                    None => DEFAULT_ACQUIRE_TIMEOUT,
                };

                Ok(StoreConfig::Postgres(PostgresConfig {
                    url,
                    max_connections,
                    acquire_timeout,
                }))
            }
            _ => Err(ConfigError::Invalid {
                name: "LEARNHUB_STORE",
                value: backend,
            }),
        }
    }

    /// Build the configured store. Postgres stores are not migrated here.
    pub async fn connect(&self) -> Result<SharedStore, StoreError> {
        match self {
            StoreConfig::Memory => {
                info!(backend = "memory", "using in-memory learning store");
                Ok(Arc::new(InMemoryLearningStore::new()))
            }
            StoreConfig::Postgres(config) => {
                info!(
                    backend = "postgres",
                    max_connections = config.max_connections,
                    "connecting learning store"
                );
                Ok(Arc::new(PostgresLearningStore::connect(config).await?))
            }
        }
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: raw.to_string(),
        })
}
