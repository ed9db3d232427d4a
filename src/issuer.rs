// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request handling: bearer credential in, signed cookies out.
//!
//! ```text
//! Start -> TokenExtracted -> Verified -> PolicyBuilt -> Signed
//!   \____________\_______________\___________\______-> Denied
//! ```
//!
//! Each call runs the whole machine; nothing is carried between calls except
//! what the two key caches hold.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{AuthError, HttpKeySetSource, JwksCache, TokenVerifier};
use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::signing::{
    CookieSigner, ExtensionSecretStore, PolicyBuilder, SignedCookieSet, SigningKeyCache,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Last stage reached before a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    TokenExtracted,
    Verified,
    PolicyBuilt,
    Signed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::TokenExtracted => "token_extracted",
            Stage::Verified => "verified",
            Stage::PolicyBuilt => "policy_built",
            Stage::Signed => "signed",
        };
        f.write_str(name)
    }
}

/// Take the token out of an `Authorization` header value.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredential)
}

pub struct CookieIssuer {
    verifier: TokenVerifier,
    policy_builder: PolicyBuilder,
    signer: CookieSigner,
    cookie_domain: String,
    resource_pattern: String,
    ttl_seconds: u64,
}

impl CookieIssuer {
    pub fn new(
        verifier: TokenVerifier,
        policy_builder: PolicyBuilder,
        signer: CookieSigner,
        cookie_domain: impl Into<String>,
        resource_pattern: impl Into<String>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            verifier,
            policy_builder,
            signer,
            cookie_domain: cookie_domain.into(),
            resource_pattern: resource_pattern.into(),
            ttl_seconds,
        }
    }

    /// Wire up the production collaborators: user pool JWKS over HTTPS and
    /// the signing key from the secrets extension.
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let jwks = Arc::new(JwksCache::new(
            Arc::new(HttpKeySetSource::new(config.jwks_url()?, client.clone())),
            clock.clone(),
        ));
        let secrets = Arc::new(ExtensionSecretStore::new(
            config.secrets_extension_url.clone(),
            config.session_token.clone(),
            client,
        ));
        let keys = Arc::new(SigningKeyCache::new(
            secrets,
            config.private_key_secret_id.clone(),
            clock.clone(),
        ));

        Ok(Self::new(
            TokenVerifier::new(
                jwks,
                clock.clone(),
                config.issuer(),
                config.app_client_id.clone(),
            ),
            PolicyBuilder::new(clock),
            CookieSigner::new(keys, config.key_pair_id.clone(), config.cookie_domain.clone()),
            config.cookie_domain.clone(),
            config.resource_pattern.clone(),
            config.cookie_ttl_seconds,
        ))
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Run one request through the machine. Denials are logged here with
    /// their error code and the stage they happened after.
    pub async fn issue(&self, authorization: Option<&str>) -> Result<SignedCookieSet, AuthError> {
        let mut stage = Stage::Start;
        let result = self.run(authorization, &mut stage).await;

        match &result {
            Ok(cookies) => info!(
                expires_at = cookies.expires_at,
                "Signed cookies issued"
            ),
            Err(e) => warn!(
                error_code = e.error_code(),
                stage = %stage,
                error = %e,
                "Request denied"
            ),
        }
        result
    }

    async fn run(
        &self,
        authorization: Option<&str>,
        stage: &mut Stage,
    ) -> Result<SignedCookieSet, AuthError> {
        let token = bearer_token(authorization)?;
        *stage = Stage::TokenExtracted;

        self.verifier.verify(token).await?;
        *stage = Stage::Verified;

        let policy =
            self.policy_builder
                .build(&self.cookie_domain, &self.resource_pattern, self.ttl_seconds)?;
        *stage = Stage::PolicyBuilt;

        let cookies = self.signer.sign(&policy).await?;
        *stage = Stage::Signed;
        Ok(cookies)
    }
}
