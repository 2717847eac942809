// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATABASE_PATH` | redb database file | `./data/software-war.redb` |
//! | `JWT_SECRET` | HS256 signing secret for session tokens | `default_secret` (warns) |
//! | `TOKEN_TTL_SECS` | Session lifetime in seconds | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

/// Environment variable name for the session signing secret.
///
/// Anyone holding this value can mint tokens for any role, so deployments
/// must set it. The fallback exists only for local development.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_PATH: &str = "./data/software-war.redb";
pub const DEFAULT_JWT_SECRET: &str = "default_secret";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `json` selects JSON lines; anything else is human-readable.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid {PORT_ENV}, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let token_ttl_secs = match lookup(TOKEN_TTL_ENV) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "Invalid {TOKEN_TTL_ENV}, using default");
                    DEFAULT_TOKEN_TTL_SECS
                }
            },
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("{JWT_SECRET_ENV} not set, using the insecure development secret");
                DEFAULT_JWT_SECRET.to_string()
            });

        let log_format = LogFormat::parse(lookup(LOG_FORMAT_ENV).as_deref());

        Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_path: lookup(DATABASE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            jwt_secret,
            token_ttl_secs,
            log_format,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.token_ttl_secs, 3600);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_SECS", "60"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_PATH", "/tmp/war.redb"),
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl_secs, 60);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_path, PathBuf::from("/tmp/war.redb"));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("TOKEN_TTL_SECS", "-5")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn empty_secret_uses_fallback() {
        let config = config_from(&[("JWT_SECRET", "")]);
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
    }
}
