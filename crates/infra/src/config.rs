//! Process configuration, read once from the environment at startup.
//!
//! Service settings use the `STOCK_HISTORY_` prefix (`STOCK_HISTORY_BIND`,
//! `STOCK_HISTORY_TICK_SECS`, ...). `DATABASE_URL` and `JWT_SECRET` keep the
//! names the host deployment already exports.

use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, Environment, Map};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_TICK_SECS: u64 = 86_400;
const DEV_JWT_SECRET: &str = "dev-secret";
const PREFIX: &str = "STOCK_HISTORY";
const SHARED_KEYS: [&str; 2] = ["DATABASE_URL", "JWT_SECRET"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{key}: '{value}' is not a valid {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    bind: SocketAddr,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    tick_secs: u64,
    run_migrations: bool,
    revert_migration: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    /// `None` runs against in-memory stores (dev only).
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// How often the scheduler wakes up to run snapshot and retention.
    pub tick: Duration,
    pub run_migrations: bool,
    /// Roll back the most recent migration and exit instead of serving.
    pub revert_migration: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit `(name, value)` pairs; `from_env` passes the process environment.
    ///
    /// Blank values count as unset.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let mut prefixed: Map<String, String> = Map::new();
        let mut shared: Map<String, String> = Map::new();
        for (key, value) in vars {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            if key.starts_with(PREFIX) {
                prefixed.insert(key, value);
            } else if SHARED_KEYS.contains(&key.as_str()) {
                shared.insert(key, value);
            }
        }

        let raw: RawConfig = Config::builder()
            .set_default("bind", DEFAULT_BIND)?
            .set_default("tick_secs", DEFAULT_TICK_SECS as i64)?
            .set_default("run_migrations", true)?
            .set_default("revert_migration", false)?
            .add_source(Environment::default().source(Some(shared)))
            .add_source(Environment::with_prefix(PREFIX).source(Some(prefixed)))
            .build()?
            .try_deserialize()?;

        if raw.tick_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "STOCK_HISTORY_TICK_SECS",
                value: raw.tick_secs.to_string(),
                expected: "positive number of seconds",
            });
        }

        let jwt_secret = raw.jwt_secret.unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            bind: raw.bind,
            database_url: raw.database_url,
            jwt_secret,
            tick: Duration::from_secs(raw.tick_secs),
            run_migrations: raw.run_migrations,
            revert_migration: raw.revert_migration,
        })
    }
}
