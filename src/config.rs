// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Server Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the record vault | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8443` |
//! | `SERVER_ENCRYPTION_KEY` | Base64 AES key (16, 24 or 32 bytes) sealing the vault | Required |
//! | `TOKEN_PRIVATE_KEY_PATH` | Ed25519 private key (PEM) signing session tokens | Required |
//! | `TOKEN_PUBLIC_KEY_PATH` | Matching Ed25519 public key (PEM), served to agents | Required |
//! | `TOKEN_TTL_SECS` | Session token lifetime | `86400` |
//! | `TLS_CERT_PATH` | TLS certificate chain (PEM) | Required |
//! | `TLS_KEY_PATH` | TLS private key (PEM) | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! ## Agent Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VAULTSYNC_DATA_DIR` | Directory holding the local store | `./.vaultsync` |
//! | `VAULTSYNC_SERVER_URL` | Base URL of the service | Required |
//! | `VAULTSYNC_ENCRYPTION_KEY` | Base64 AES key sealing the local store | Required |
//! | `VAULTSYNC_CA_CERT_PATH` | Extra trusted root CA (PEM) | None |
//! | `VAULTSYNC_TIMEOUT_SECS` | Per-request timeout | `30` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use url::Url;

use crate::auth::DEFAULT_TOKEN_TTL_SECS;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SERVER_ENCRYPTION_KEY_ENV: &str = "SERVER_ENCRYPTION_KEY";
pub const TOKEN_PRIVATE_KEY_PATH_ENV: &str = "TOKEN_PRIVATE_KEY_PATH";
pub const TOKEN_PUBLIC_KEY_PATH_ENV: &str = "TOKEN_PUBLIC_KEY_PATH";
pub const TOKEN_TTL_SECS_ENV: &str = "TOKEN_TTL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const AGENT_DATA_DIR_ENV: &str = "VAULTSYNC_DATA_DIR";
pub const AGENT_SERVER_URL_ENV: &str = "VAULTSYNC_SERVER_URL";
pub const AGENT_ENCRYPTION_KEY_ENV: &str = "VAULTSYNC_ENCRYPTION_KEY";
pub const AGENT_CA_CERT_PATH_ENV: &str = "VAULTSYNC_CA_CERT_PATH";
pub const AGENT_TIMEOUT_SECS_ENV: &str = "VAULTSYNC_TIMEOUT_SECS";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8443;
const DEFAULT_AGENT_DATA_DIR: &str = "./.vaultsync";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Settings for the `vaultsync-server` binary.
#[derive(Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub encryption_key: Vec<u8>,
    pub token_private_key_path: PathBuf,
    pub token_public_key_path: PathBuf,
    pub token_ttl_secs: i64,
    pub tls_cert_path: PathBuf,
    pub tls_key_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = host.parse().map_err(|e| invalid(HOST_ENV, e))?;
        let port = parse_or(&lookup, PORT_ENV, DEFAULT_PORT)?;

        let token_ttl_secs = parse_or(&lookup, TOKEN_TTL_SECS_ENV, DEFAULT_TOKEN_TTL_SECS)?;
        if token_ttl_secs <= 0 {
            return Err(invalid(TOKEN_TTL_SECS_ENV, "must be positive"));
        }

        Ok(Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            bind_addr: SocketAddr::new(host, port),
            encryption_key: base64_key(&lookup, SERVER_ENCRYPTION_KEY_ENV)?,
            token_private_key_path: required(&lookup, TOKEN_PRIVATE_KEY_PATH_ENV)?.into(),
            token_public_key_path: required(&lookup, TOKEN_PUBLIC_KEY_PATH_ENV)?.into(),
            token_ttl_secs,
            tls_cert_path: required(&lookup, TLS_CERT_PATH_ENV)?.into(),
            tls_key_path: required(&lookup, TLS_KEY_PATH_ENV)?.into(),
        })
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("data_dir", &self.data_dir)
            .field("bind_addr", &self.bind_addr)
            .field("encryption_key", &"<redacted>")
            .field("token_private_key_path", &self.token_private_key_path)
            .field("token_public_key_path", &self.token_public_key_path)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .finish()
    }
}

/// Settings for a local agent.
#[derive(Clone)]
pub struct AgentConfig {
    pub data_dir: PathBuf,
    pub server_url: Url,
    pub encryption_key: Vec<u8>,
    pub ca_cert_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl AgentConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let server_url = required(&lookup, AGENT_SERVER_URL_ENV)?;
        let server_url = Url::parse(&server_url).map_err(|e| invalid(AGENT_SERVER_URL_ENV, e))?;
        let timeout_secs = parse_or(&lookup, AGENT_TIMEOUT_SECS_ENV, DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            data_dir: lookup(AGENT_DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENT_DATA_DIR)),
            server_url,
            encryption_key: base64_key(&lookup, AGENT_ENCRYPTION_KEY_ENV)?,
            ca_cert_path: lookup(AGENT_CA_CERT_PATH_ENV).map(PathBuf::from),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("data_dir", &self.data_dir)
            .field("server_url", &self.server_url.as_str())
            .field("encryption_key", &"<redacted>")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn invalid(var: &'static str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> ConfigResult<String> {
    lookup(var)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|e| invalid(var, e)),
        None => Ok(default),
    }
}

/// Decode a base64 key. Length is checked when the cipher is built.
fn base64_key(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> ConfigResult<Vec<u8>> {
    let encoded = required(lookup, var)?;
    Base64::decode_vec(encoded.trim()).map_err(|e| invalid(var, e))
}
