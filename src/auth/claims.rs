// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token header and claims.
//!
//! The fields the verifier checks are typed; anything else the provider adds
//! (`cognito:groups`, `auth_time`, ...) lands in `extra`.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// JOSE header of a compact token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    pub alg: String,

    #[serde(default)]
    pub kid: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Which Cognito token was presented.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TokenUse {
    Id,
    Access,
    Other(String),
}

impl From<String> for TokenUse {
    fn from(value: String) -> Self {
        match value.as_str() {
            "id" => TokenUse::Id,
            "access" => TokenUse::Access,
            _ => TokenUse::Other(value),
        }
    }
}

/// `aud` may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

/// Claims carried by a Cognito ID or access token.
///
/// Returned to callers only after the signature and every claim check passed.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatedClaims {
    /// Issuer (the user pool URL)
    #[serde(default)]
    pub iss: Option<String>,

    /// Subject (the user's pool ID)
    #[serde(default)]
    pub sub: Option<String>,

    /// Audience, present on ID tokens
    #[serde(default)]
    pub aud: Option<Audience>,

    /// App client ID, present on access tokens
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub token_use: Option<TokenUse>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: Option<i64>,

    /// Not before timestamp
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ValidatedClaims {
    /// Whether the token was minted for `client_id`.
    ///
    /// ID tokens carry the client in `aud`, access tokens in `client_id`.
    pub fn is_for_client(&self, client_id: &str) -> bool {
        match self.token_use {
            Some(TokenUse::Id) => self.aud.as_ref().is_some_and(|aud| aud.contains(client_id)),
            Some(TokenUse::Access) => self.client_id.as_deref() == Some(client_id),
            _ => false,
        }
    }
}
