// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`Config`] loaded from the environment at startup. Loading fails fast: a
//! missing required value stops the process before it binds a socket.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AWS_REGION` | Region of the Cognito user pool | Required |
//! | `COG_USER_POOL_ID` | Cognito user pool ID | Required |
//! | `COG_APP_CLIENT_ID` | App client ID (expected audience) | Required |
//! | `CF_COOKIE_DOMAIN` | Cookie domain and policy host | Required |
//! | `CF_KEY_PAIR_ID` | CloudFront key pair (public key) ID | Required |
//! | `PRIVATE_KEY_ARN` | Secret holding the signing key bundle | Required |
//! | `CF_RESOURCE` | Protected resource pattern | `/restricted/*` |
//! | `COOKIE_TTL_SECONDS` | Policy and cookie lifetime | `1800` |
//! | `SECRETS_EXTENSION_URL` | Local secrets extension endpoint | `http://localhost:2773` |
//! | `AWS_SESSION_TOKEN` | Token presented to the secrets extension | Optional |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use url::Url;

pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const USER_POOL_ID_ENV: &str = "COG_USER_POOL_ID";
pub const APP_CLIENT_ID_ENV: &str = "COG_APP_CLIENT_ID";
pub const COOKIE_DOMAIN_ENV: &str = "CF_COOKIE_DOMAIN";
pub const KEY_PAIR_ID_ENV: &str = "CF_KEY_PAIR_ID";
pub const PRIVATE_KEY_ARN_ENV: &str = "PRIVATE_KEY_ARN";
pub const RESOURCE_ENV: &str = "CF_RESOURCE";
pub const COOKIE_TTL_ENV: &str = "COOKIE_TTL_SECONDS";
pub const SECRETS_EXTENSION_URL_ENV: &str = "SECRETS_EXTENSION_URL";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Protected path prefix used when `CF_RESOURCE` is unset.
pub const DEFAULT_RESOURCE: &str = "/restricted/*";

/// Cookie lifetime used when `COOKIE_TTL_SECONDS` is unset or unparseable (30 minutes).
pub const DEFAULT_COOKIE_TTL_SECONDS: u64 = 1800;

/// Port of the Parameters and Secrets extension inside the execution environment.
pub const DEFAULT_SECRETS_EXTENSION_URL: &str = "http://localhost:2773";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing env var: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the process environment.
    ///
    /// Kept apart from [`Config`] so logging is up before configuration
    /// errors need reporting.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::parse(lookup(LOG_FORMAT_ENV).as_deref())
    }

    /// `json` (any case) selects JSON; anything else is pretty.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Process configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub user_pool_id: String,
    pub app_client_id: String,
    pub cookie_domain: String,
    pub key_pair_id: String,
    pub private_key_secret_id: String,
    pub resource_pattern: String,
    pub cookie_ttl_seconds: u64,
    pub secrets_extension_url: Url,
    pub session_token: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Values are trimmed; an empty value counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let region = required(AWS_REGION_ENV)?;
        let user_pool_id = required(USER_POOL_ID_ENV)?;
        let app_client_id = required(APP_CLIENT_ID_ENV)?;
        let cookie_domain = required(COOKIE_DOMAIN_ENV)?;
        let key_pair_id = required(KEY_PAIR_ID_ENV)?;
        let private_key_secret_id = required(PRIVATE_KEY_ARN_ENV)?;

        let resource_pattern =
            get(RESOURCE_ENV).unwrap_or_else(|| DEFAULT_RESOURCE.to_string());

        // Unparseable TTLs fall back to the default rather than failing startup.
        let cookie_ttl_seconds = get(COOKIE_TTL_ENV)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_COOKIE_TTL_SECONDS);

        let secrets_extension_url = get(SECRETS_EXTENSION_URL_ENV)
            .unwrap_or_else(|| DEFAULT_SECRETS_EXTENSION_URL.to_string());
        let secrets_extension_url =
            Url::parse(&secrets_extension_url).map_err(|e| ConfigError::Invalid {
                name: SECRETS_EXTENSION_URL_ENV,
                reason: e.to_string(),
            })?;

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("not a port number: {raw}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            region,
            user_pool_id,
            app_client_id,
            cookie_domain,
            key_pair_id,
            private_key_secret_id,
            resource_pattern,
            cookie_ttl_seconds,
            secrets_extension_url,
            session_token: get(SESSION_TOKEN_ENV),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    /// Expected `iss` claim of tokens minted by the user pool.
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }

    /// Location of the user pool's published key set.
    pub fn jwks_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!("{}/.well-known/jwks.json", self.issuer())).map_err(|e| {
            ConfigError::Invalid {
                name: USER_POOL_ID_ENV,
                reason: e.to_string(),
            }
        })
    }
}
