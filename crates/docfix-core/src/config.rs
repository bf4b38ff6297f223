//! Harness configuration.
//!
//! A test suite names one store address and one fixture collection. Defaults
//! match a local development server; every value can be overridden from the
//! environment (optionally via a `.env` file).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Default store address used when `DOCFIX_STORE_ADDRESS` is unset.
pub const DEFAULT_STORE_ADDRESS: &str = "localhost:27017/digitalgateway";

/// Default fixture collection used when `DOCFIX_COLLECTION` is unset.
pub const DEFAULT_COLLECTION: &str = "users";

/// Port assumed when the address does not name one.
pub const DEFAULT_STORE_PORT: u16 = 27017;

/// Default connect/handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEME: &str = "mongodb://";

const ENV_STORE_ADDRESS: &str = "DOCFIX_STORE_ADDRESS";
const ENV_COLLECTION: &str = "DOCFIX_COLLECTION";
const ENV_CONNECT_TIMEOUT_MS: &str = "DOCFIX_CONNECT_TIMEOUT_MS";
const ENV_APP_NAME: &str = "DOCFIX_APP_NAME";

/// Errors raised while building configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid store address `{address}`: {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    #[error("Collection name cannot be empty")]
    EmptyCollection,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Parsed `host:port/databaseName` store address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StoreAddress {
    host: String,
    port: u16,
    database: String,
}

impl StoreAddress {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.into();
        let database = database.into();
        let rendered = format!("{host}:{port}/{database}");
        if host.is_empty() {
            return Err(ConfigError::InvalidAddress {
                address: rendered,
                reason: "host is missing",
            });
        }
        if database.is_empty() {
            return Err(ConfigError::InvalidAddress {
                address: rendered,
                reason: "database name is missing",
            });
        }
        Ok(Self {
            host,
            port,
            database,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Connection URI for the server, without the database path.
    pub fn server_uri(&self) -> String {
        format!("{SCHEME}{}:{}", self.host, self.port)
    }
}

impl FromStr for StoreAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ConfigError::InvalidAddress {
            address: s.to_string(),
            reason,
        };

        let rest = s.trim().strip_prefix(SCHEME).unwrap_or_else(|| s.trim());
        let (authority, database) = rest
            .split_once('/')
            .ok_or_else(|| invalid("expected host:port/databaseName"))?;

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| invalid("port is not a number"))?;
                (host, port)
            }
            None => (authority, DEFAULT_STORE_PORT),
        };

        if database.contains('/') || database.contains('?') {
            return Err(invalid("database name must be a single path segment"));
        }

        Self::new(host, port, database).map_err(|_| {
            if host.is_empty() {
                invalid("host is missing")
            } else {
                invalid("database name is missing")
            }
        })
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Configuration for a [`Harness`](crate::Harness).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessConfig {
    /// Store to connect to.
    pub address: StoreAddress,
    /// Collection used for fixture data.
    pub collection: String,
    /// Upper bound on connecting and the initial handshake.
    pub connect_timeout: Duration,
    /// Client name reported to the store, if it supports one.
    pub app_name: Option<String>,
}

impl HarnessConfig {
    pub fn new(address: StoreAddress, collection: impl Into<String>) -> Result<Self, ConfigError> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        Ok(Self {
            address,
            collection,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            app_name: None,
        })
    }

    /// Configuration pointing at a local development server.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(DEFAULT_STORE_ADDRESS.parse()?, DEFAULT_COLLECTION)
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first
    /// if present; variables already set take precedence.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup(ENV_STORE_ADDRESS)
            .unwrap_or_else(|| DEFAULT_STORE_ADDRESS.to_string())
            .parse()?;
        let collection = lookup(ENV_COLLECTION).unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

        let mut config = Self::new(address, collection)?;

        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_CONNECT_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            if millis == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_CONNECT_TIMEOUT_MS,
                    value: raw,
                });
            }
            config.connect_timeout = Duration::from_millis(millis);
        }

        if let Some(name) = lookup(ENV_APP_NAME).filter(|n| !n.trim().is_empty()) {
            config.app_name = Some(name);
        }

        Ok(config)
    }
}
