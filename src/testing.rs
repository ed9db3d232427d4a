// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test fixtures: RSA keys, token minting, and in-memory fakes for the
//! clock, the key set source and the secret store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::jwk::JwkSet;
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::auth::{AuthError, KeySetSource};
use crate::clock::Clock;
use crate::signing::{SecretStore, SecretStoreError, SecretValue};

pub const KID: &str = "test-key-1";
pub const EDGE_KID: &str = "edge-key-1";
pub const ISSUER: &str = "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_TestPool";
pub const CLIENT_ID: &str = "test-client-id";
pub const KEY_PAIR_ID: &str = "K2JCJMDEHXQW5F";
pub const COOKIE_DOMAIN: &str = "cdn.example.com";

/// Fixed "now" for every fake clock (2025-10-09T08:53:20Z).
pub const NOW: i64 = 1_760_000_000;

fn generate(slot: &'static OnceLock<RsaPrivateKey>) -> &'static RsaPrivateKey {
    slot.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("generate RSA key"))
}

/// Key the identity provider signs tokens with; published in [`jwks`].
pub fn provider_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    generate(&KEY)
}

/// A key nobody published.
pub fn other_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    generate(&KEY)
}

/// CloudFront signing key, stored in the secret by [`bundle_json`].
pub fn edge_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    generate(&KEY)
}

// =============================================================================
// Key sets and tokens
// =============================================================================

pub fn jwk_json_for(key: &RsaPrivateKey, kid: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": Base64UrlUnpadded::encode_string(&key.n().to_bytes_be()),
        "e": Base64UrlUnpadded::encode_string(&key.e().to_bytes_be()),
    })
}

pub fn jwks_json() -> Value {
    json!({ "keys": [jwk_json_for(provider_key(), KID)] })
}

pub fn jwks() -> JwkSet {
    serde_json::from_value(jwks_json()).expect("valid JWKS")
}

/// The provider key published under a different `kid`.
pub fn jwks_with_kid(kid: &str) -> JwkSet {
    serde_json::from_value(json!({ "keys": [jwk_json_for(provider_key(), kid)] }))
        .expect("valid JWKS")
}

/// Sign arbitrary header and claims as RS256, whatever `alg` the header says.
pub fn mint(header: Value, claims: Value, key: &RsaPrivateKey) -> String {
    let header = Base64UrlUnpadded::encode_string(header.to_string().as_bytes());
    let claims = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
    let signing_input = format!("{header}.{claims}");
    let signature = SigningKey::<Sha256>::new(key.clone())
        .sign(signing_input.as_bytes())
        .to_vec();
    format!(
        "{signing_input}.{}",
        Base64UrlUnpadded::encode_string(&signature)
    )
}

pub fn rs256_header(kid: &str) -> Value {
    json!({ "alg": "RS256", "kid": kid, "typ": "JWT" })
}

/// ID token claims for [`CLIENT_ID`], issued at [`NOW`] and valid for an hour.
pub fn id_token_claims() -> Value {
    json!({
        "sub": "user-1",
        "iss": ISSUER,
        "aud": CLIENT_ID,
        "token_use": "id",
        "cognito:username": "user-1",
        "iat": NOW,
        "exp": NOW + 3600,
    })
}

pub fn valid_id_token() -> String {
    mint(rs256_header(KID), id_token_claims(), provider_key())
}

// =============================================================================
// Signing key secret
// =============================================================================

fn bundle_with_private_pem(private_key_pem: &str) -> String {
    let public_key_pem = edge_key()
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("encode public key");
    json!({
        "kid": EDGE_KID,
        "kty": "RSA",
        "alg": "RS256",
        "use": "sig",
        "privateKeyPem": private_key_pem,
        "publicKeyPem": public_key_pem,
    })
    .to_string()
}

/// Secret payload holding [`edge_key`] as PKCS#8 PEM.
pub fn bundle_json() -> String {
    let pem = edge_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode PKCS#8");
    bundle_with_private_pem(&pem)
}

/// Secret payload holding [`edge_key`] as PKCS#1 PEM.
pub fn bundle_json_pkcs1() -> String {
    let pem = edge_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("encode PKCS#1");
    bundle_with_private_pem(&pem)
}

// =============================================================================
// Fakes
// =============================================================================

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(DateTime::from_timestamp(NOW, 0).expect("valid timestamp")),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Key set source serving a fixed set and counting fetches.
pub struct StaticKeySetSource {
    result: Mutex<Result<JwkSet, String>>,
    fetches: AtomicUsize,
}

impl StaticKeySetSource {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            result: Mutex::new(Ok(jwks)),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, jwks: JwkSet) {
        *self.result.lock().unwrap() = Ok(jwks);
    }

    pub fn fail_with(&self, reason: &str) {
        *self.result.lock().unwrap() = Err(reason.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .unwrap()
            .clone()
            .map_err(AuthError::KeySetUnavailable)
    }
}

/// Secret store holding one string secret and counting reads.
pub struct StaticSecretStore {
    result: Mutex<Result<(String, String), String>>,
    fetches: AtomicUsize,
}

impl StaticSecretStore {
    pub fn new(secret: String, version_id: &str) -> Self {
        Self {
            result: Mutex::new(Ok((secret, version_id.to_string()))),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, secret: String, version_id: &str) {
        *self.result.lock().unwrap() = Ok((secret, version_id.to_string()));
    }

    pub fn fail_with(&self, reason: &str) {
        *self.result.lock().unwrap() = Err(reason.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn current_secret(&self, _secret_id: &str) -> Result<SecretValue, SecretStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = self.result.lock().unwrap().clone();
        result
            .map(|(secret, version)| SecretValue::from_string(secret, Some(version)))
            .map_err(SecretStoreError::Request)
    }
}
