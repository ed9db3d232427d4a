// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Refresh rules
//!
//! - A cached key is served while the set is younger than the freshness
//!   window (12 hours) and contains the requested `kid`.
//! - Otherwise the set is fetched once, replaced wholesale and the lookup is
//!   retried once. A `kid` still missing after that is unknown.
//! - A failed fetch leaves the previous set in place but fails the current
//!   lookup.
//!
//! Concurrent refreshes are not coalesced: two requests that both miss will
//! both fetch, and the last write wins. Both results are equivalent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::error::AuthError;
use crate::clock::Clock;

/// Maximum age of a cached key set before it is refetched (12 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Provider public key, as published in the key set.
pub type PublicKeyRecord = Jwk;

/// Where the provider's key set document comes from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set. Failures map to [`AuthError::KeySetUnavailable`].
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set document over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    jwks_url: Url,
    client: reqwest::Client,
}

impl HttpKeySetSource {
    pub fn new(jwks_url: Url, client: reqwest::Client) -> Self {
        Self { jwks_url, client }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let document = response
            .json::<KeySetDocument>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;
        Ok(document.into_key_set())
    }
}

/// Key set document with entries left unparsed, so one key of a type we
/// cannot represent does not take the whole set down.
#[derive(Debug, Deserialize)]
struct KeySetDocument {
    keys: Vec<Value>,
}

impl KeySetDocument {
    fn into_key_set(self) -> JwkSet {
        let keys = self
            .keys
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Jwk>(entry) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    debug!(error = %e, "Skipping unsupported JWKS entry");
                    None
                }
            })
            .collect();
        JwkSet { keys }
    }
}

/// Key set indexed by key ID.
pub type KeysById = HashMap<String, PublicKeyRecord>;

/// JWKS cache entry.
struct CacheEntry {
    keys: Arc<KeysById>,
    fetched_at: DateTime<Utc>,
}

/// Process-lifetime cache of the provider's signing keys.
pub struct JwksCache {
    source: Arc<dyn KeySetSource>,
    clock: Arc<dyn Clock>,
    max_age: TimeDelta,
    cache: RwLock<Option<CacheEntry>>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySetSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            max_age: to_time_delta(DEFAULT_MAX_AGE),
            cache: RwLock::new(None),
        }
    }

    /// Create with a custom freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = to_time_delta(max_age);
        self
    }

    /// Look up the public key for `kid`, refreshing the set at most once.
    pub async fn resolve(
        &self,
        kid: &str,
        force_refresh: bool,
    ) -> Result<PublicKeyRecord, AuthError> {
        if !force_refresh {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if !self.is_stale(entry) {
                    if let Some(jwk) = entry.keys.get(kid) {
                        return Ok(jwk.clone());
                    }
                    debug!(kid, "kid not in cached key set, refreshing");
                }
            }
        }

        let keys = self.refresh().await?;
        keys.get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownSigningKey(Some(kid.to_string())))
    }

    /// Fetch the key set and replace the cache with it.
    pub async fn refresh(&self) -> Result<Arc<KeysById>, AuthError> {
        let jwks = match self.source.fetch().await {
            Ok(jwks) => jwks,
            Err(e) => {
                warn!(error = %e, "JWKS refresh failed, keeping previous key set");
                return Err(e);
            }
        };

        let keys = Arc::new(index_by_kid(jwks));
        info!(key_count = keys.len(), "JWKS refreshed");

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys: keys.clone(),
            fetched_at: self.clock.now(),
        });
        Ok(keys)
    }

    /// Check if a key set is cached and inside the freshness window.
    pub async fn is_fresh(&self) -> bool {
        let cache = self.cache.read().await;
        cache.as_ref().is_some_and(|entry| !self.is_stale(entry))
    }

    fn is_stale(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.fetched_at > self.max_age
    }
}

/// Keys without a `kid` cannot be selected by a token header and are dropped.
fn index_by_kid(jwks: JwkSet) -> KeysById {
    jwks.keys
        .into_iter()
        .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
        .collect()
}

fn to_time_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
