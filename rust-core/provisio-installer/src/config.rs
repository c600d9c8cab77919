// SPDX-License-Identifier: PMPL-1.0-or-later
//! Connection configuration.
//!
//! [`ConnectOptions`] is what callers hand in: every field optional, loadable
//! from serde or the environment. [`ConnectOptions::validate`] normalizes it
//! into an immutable [`Config`] before any network call is made.
//!
//! Defaults: host `localhost`, port `28015`, no connection limit.

use provisio_cluster::{Endpoint, ObjectKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "localhost";

/// The store's standard client port.
pub const DEFAULT_PORT: u16 = 28015;

/// Environment variable overriding the host.
pub const ENV_HOST: &str = "PROVISIO_HOST";
/// Environment variable overriding the port.
pub const ENV_PORT: &str = "PROVISIO_PORT";
/// Environment variable naming the database.
pub const ENV_DB: &str = "PROVISIO_DB";
/// Environment variable bounding concurrently open connections.
pub const ENV_MAX_CONNECTIONS: &str = "PROVISIO_MAX_CONNECTIONS";

/// Configuration rejected before reaching the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No database name was given.
    #[error("database must be specified")]
    MissingDb,

    /// Port 0 cannot be dialled.
    #[error("port must be between 1 and 65535")]
    InvalidPort,

    /// A database or table name contains characters the store rejects.
    #[error("invalid {kind} name `{name}`: {reason}")]
    InvalidName {
        /// Database or table.
        kind: ObjectKind,
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A connection limit of zero would deadlock every operation.
    #[error("max_connections must be at least 1")]
    ZeroConnectionLimit,

    /// An environment variable could not be parsed.
    #[error("environment variable {var} has invalid value `{value}`")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Check `name` against the store's identifier rules (`[A-Za-z0-9_-]+`).
pub fn check_name(kind: ObjectKind, name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Some("only letters, digits, '_' and '-' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidName {
            kind,
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// ConnectOptions
// ---------------------------------------------------------------------------

/// Raw connection parameters as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Cluster host; defaults to [`DEFAULT_HOST`].
    pub host: Option<String>,
    /// Cluster port; defaults to [`DEFAULT_PORT`].
    pub port: Option<u16>,
    /// Database to provision. Required.
    pub db: Option<String>,
    /// Upper bound on concurrently open connections; unbounded when absent.
    pub max_connections: Option<usize>,
}

impl ConnectOptions {
    /// Options targeting database `db` with every other field defaulted.
    pub fn new(db: impl Into<String>) -> Self {
        Self {
            db: Some(db.into()),
            ..Self::default()
        }
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Bound the number of concurrently open connections.
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.max_connections = Some(limit);
        self
    }

    /// Read options from `PROVISIO_*` environment variables.
    ///
    /// Unset variables stay `None`; validation decides whether that is fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read options through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(ENV_PORT) {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_PORT,
                value: raw.clone(),
            })?),
            None => None,
        };

        let max_connections = match lookup(ENV_MAX_CONNECTIONS) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                ConfigError::InvalidEnv {
                    var: ENV_MAX_CONNECTIONS,
                    value: raw.clone(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            host: lookup(ENV_HOST),
            port,
            db: lookup(ENV_DB),
            max_connections,
        })
    }

    /// Normalize and validate into a [`Config`].
    ///
    /// Host and database are trimmed; a blank host falls back to
    /// [`DEFAULT_HOST`]. Fails without touching the network.
    pub fn validate(&self) -> Result<Config, ConfigError> {
        let db = self
            .db
            .as_deref()
            .map(str::trim)
            .filter(|db| !db.is_empty())
            .ok_or(ConfigError::MissingDb)?;
        check_name(ObjectKind::Database, db)?;

        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .unwrap_or(DEFAULT_HOST);

        let port = self.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.max_connections == Some(0) {
            return Err(ConfigError::ZeroConnectionLimit);
        }

        Ok(Config {
            host: host.to_owned(),
            port,
            db: db.to_owned(),
            max_connections: self.max_connections,
        })
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Validated, immutable connection configuration.
///
/// Only [`ConnectOptions::validate`] constructs one, so every `Config` in
/// circulation has a non-empty, well-formed database name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    host: String,
    port: u16,
    db: String,
    max_connections: Option<usize>,
}

impl Config {
    /// Cluster host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Cluster port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Database this configuration provisions.
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Connection limit, if any.
    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    /// The cluster endpoint to dial.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}
