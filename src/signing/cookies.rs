// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CloudFront signed cookies.
//!
//! CloudFront expects the policy and its RSA-SHA1 signature in base64 with
//! the cookie-unsafe characters swapped: `+` -> `-`, `=` -> `_`, `/` -> `~`.

use std::fmt;
use std::sync::Arc;

use base64ct::{Base64, Encoding};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use secrecy::ExposeSecret;
use sha1::Sha1;

use super::key_cache::SigningKeyCache;
use super::policy::AccessPolicy;
use crate::auth::AuthError;

pub const POLICY_COOKIE: &str = "CloudFront-Policy";
pub const SIGNATURE_COOKIE: &str = "CloudFront-Signature";
pub const KEY_PAIR_ID_COOKIE: &str = "CloudFront-Key-Pair-Id";

/// Standard base64 with `+`, `=` and `/` replaced by `-`, `_` and `~`.
pub fn cookie_safe_encode(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}

/// Inverse of [`cookie_safe_encode`].
pub fn cookie_safe_decode(value: &str) -> Option<Vec<u8>> {
    let standard: String = value
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '=',
            '~' => '/',
            other => other,
        })
        .collect();
    Base64::decode_vec(&standard).ok()
}

/// Attributes shared by all three cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub domain: String,
    pub max_age: u64,
}

impl fmt::Display for CookieAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Path=/; Domain={}; Secure; HttpOnly; SameSite=Lax; Max-Age={}",
            self.domain, self.max_age
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookie {
    pub name: &'static str,
    pub value: String,
    pub attributes: CookieAttributes,
}

impl fmt::Display for SignedCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; {}", self.name, self.value, self.attributes)
    }
}

/// The policy, signature and key-pair id cookies for one grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookieSet {
    pub policy: SignedCookie,
    pub signature: SignedCookie,
    pub key_pair_id: SignedCookie,
    /// Epoch second the grant ends
    pub expires_at: i64,
}

impl SignedCookieSet {
    /// `Set-Cookie` header values, in emission order.
    pub fn header_values(&self) -> [String; 3] {
        [
            self.policy.to_string(),
            self.signature.to_string(),
            self.key_pair_id.to_string(),
        ]
    }
}

/// Signs policies with the current edge key and packages them as cookies.
pub struct CookieSigner {
    keys: Arc<SigningKeyCache>,
    key_pair_id: String,
    cookie_domain: String,
}

impl CookieSigner {
    pub fn new(
        keys: Arc<SigningKeyCache>,
        key_pair_id: impl Into<String>,
        cookie_domain: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            key_pair_id: key_pair_id.into(),
            cookie_domain: cookie_domain.into(),
        }
    }

    pub async fn sign(&self, policy: &AccessPolicy) -> Result<SignedCookieSet, AuthError> {
        let bundle = self.keys.resolve(false).await?;
        let private_key = parse_private_key(bundle.private_key_pem.expose_secret())?;

        let signature = SigningKey::<Sha1>::new(private_key)
            .try_sign(policy.document().as_bytes())
            .map_err(|e| AuthError::SignatureFailure(e.to_string()))?
            .to_vec();

        let attributes = CookieAttributes {
            domain: self.cookie_domain.clone(),
            max_age: policy.ttl_seconds(),
        };

        Ok(SignedCookieSet {
            policy: SignedCookie {
                name: POLICY_COOKIE,
                value: cookie_safe_encode(policy.document().as_bytes()),
                attributes: attributes.clone(),
            },
            signature: SignedCookie {
                name: SIGNATURE_COOKIE,
                value: cookie_safe_encode(&signature),
                attributes: attributes.clone(),
            },
            key_pair_id: SignedCookie {
                name: KEY_PAIR_ID_COOKIE,
                value: self.key_pair_id.clone(),
                attributes,
            },
            expires_at: policy.expires_at(),
        })
    }
}

/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`).
fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, AuthError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| AuthError::SignatureFailure("private key is not a PEM RSA key".to_string()))
}
