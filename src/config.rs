use std::env;

use chrono::{Duration, Utc};
use thiserror::Error;

/// Startup configuration problems. Reported once by `main` and fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

pub struct Config {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    /// Lifetime of issued tokens. `None` issues tokens without an `exp` claim.
    pub token_ttl: Option<Duration>,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let server_port = match lookup("SERVER_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "SERVER_PORT",
                value,
            })?,
            None => 8080,
        };

        let token_ttl = match lookup("TOKEN_TTL_HOURS") {
            Some(value) => match value.parse::<i64>().ok().and_then(ttl_from_hours) {
                Some(ttl) => Some(ttl),
                None => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_HOURS",
                        value,
                    })
                }
            },
            None => None,
        };

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(value) => match value.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "BCRYPT_COST",
                        value,
                    })
                }
            },
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            server_port,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            token_ttl,
            bcrypt_cost,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

/// A positive lifetime whose expiry instant is still a representable date.
fn ttl_from_hours(hours: i64) -> Option<Duration> {
    if hours <= 0 {
        return None;
    }
    Duration::try_hours(hours).filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
}
