// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`Config`] read from them
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `secrets.redb` (`:memory:` for no persistence) | `./data` |
//! | `MOBILE_JWT_SECRET` | HS256 secret for mobile access tokens | `SESSION_SECRET`, else random |
//! | `SESSION_SECRET` | HS256 secret for web-session tokens | Unset disables pairing requests |
//! | `TLS_CERT_PATH` | PEM certificate chain | Plain HTTP when unset |
//! | `TLS_KEY_PATH` | PEM private key | Plain HTTP when unset |
//! | `EXCHANGE_RATE_LIMIT` | Exchange attempts per client per window (at least 1) | `5` |
//! | `EXCHANGE_RATE_WINDOW_SECS` | Exchange rate window in seconds (1 to 86400) | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::rate_limit::{RateLimitConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_SECS};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the secret store directory.
///
/// The redb file `secrets.redb` is created inside it on first start. The
/// special value `:memory:` keeps everything in RAM (lost on exit).
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// HS256 secret for access tokens. Rotating it logs out every paired device
/// until its next refresh.
pub const MOBILE_JWT_SECRET_ENV: &str = "MOBILE_JWT_SECRET";

/// HS256 secret shared with the web tier for session tokens.
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const EXCHANGE_RATE_LIMIT_ENV: &str = "EXCHANGE_RATE_LIMIT";
pub const EXCHANGE_RATE_WINDOW_ENV: &str = "EXCHANGE_RATE_WINDOW_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const IN_MEMORY_DATA_DIR: &str = ":memory:";

/// File name of the secret store inside `DATA_DIR`.
pub const SECRET_DB_FILE: &str = "secrets.redb";

/// Longest accepted exchange rate window (one day).
pub const MAX_RATE_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid bind address: {0}")]
    BindAddress(#[from] AddrParseError),

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

/// Where the secret store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    InMemory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub storage: StorageLocation,
    pub mobile_jwt_secret: Option<String>,
    pub session_secret: Option<String>,
    pub tls: Option<TlsPaths>,
    /// Attempts per window, at least 1
    pub exchange_rate_limit: u32,
    /// Positive and at most [`MAX_RATE_WINDOW_SECS`]
    pub exchange_rate_window: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr = format!("{host}:{port}").parse()?;

        let storage = match get(DATA_DIR_ENV) {
            Some(dir) if dir == IN_MEMORY_DATA_DIR => StorageLocation::InMemory,
            Some(dir) => StorageLocation::File(PathBuf::from(dir).join(SECRET_DB_FILE)),
            None => StorageLocation::File(PathBuf::from(DEFAULT_DATA_DIR).join(SECRET_DB_FILE)),
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: LOG_FORMAT_ENV,
                value,
            })?,
            None => LogFormat::default(),
        };

        let exchange_rate_limit: u32 =
            parse_or(&get, EXCHANGE_RATE_LIMIT_ENV, DEFAULT_MAX_ATTEMPTS)?;
        if exchange_rate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: EXCHANGE_RATE_LIMIT_ENV,
                value: exchange_rate_limit.to_string(),
            });
        }

        // A zero or negative window would reset on every call and never limit.
        let window_secs: i64 = parse_or(&get, EXCHANGE_RATE_WINDOW_ENV, DEFAULT_WINDOW_SECS)?;
        let exchange_rate_window = (1..=MAX_RATE_WINDOW_SECS)
            .contains(&window_secs)
            .then(|| Duration::try_seconds(window_secs))
            .flatten()
            .ok_or_else(|| ConfigError::InvalidValue {
                name: EXCHANGE_RATE_WINDOW_ENV,
                value: window_secs.to_string(),
            })?;

        Ok(Self {
            bind_addr,
            storage,
            mobile_jwt_secret: get(MOBILE_JWT_SECRET_ENV),
            session_secret: get(SESSION_SECRET_ENV),
            tls,
            exchange_rate_limit,
            exchange_rate_window,
            log_format,
        })
    }

    /// Secret for signing access tokens, in order of preference.
    ///
    /// Returns `None` when neither secret is configured; the caller then
    /// generates a per-process one.
    pub fn access_token_secret(&self) -> Option<&str> {
        self.mobile_jwt_secret
            .as_deref()
            .or(self.session_secret.as_deref())
    }

    pub fn exchange_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_attempts: self.exchange_rate_limit,
            window: self.exchange_rate_window,
        }
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
