// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CloudFront custom policy documents.
//!
//! A custom policy grants access to every URL matching `Resource` until the
//! `AWS:EpochTime` given in `DateLessThan`:
//!
//! ```json
//! {"Statement":[{"Resource":"https://cdn.example.com/restricted/*",
//!   "Condition":{"DateLessThan":{"AWS:EpochTime":1760001800}}}]}
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::auth::AuthError;
use crate::clock::Clock;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument<'a> {
    statement: [Statement<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Statement<'a> {
    resource: &'a str,
    condition: Condition,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Condition {
    date_less_than: EpochTime,
}

#[derive(Serialize)]
struct EpochTime {
    #[serde(rename = "AWS:EpochTime")]
    epoch_time: i64,
}

/// A serialized policy together with the values it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    resource: String,
    expires_at: i64,
    ttl_seconds: u64,
    document: String,
}

impl AccessPolicy {
    /// Absolute resource URL the policy grants.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Epoch second before which access is granted.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Exact JSON bytes that get signed and sent in the policy cookie.
    pub fn document(&self) -> &str {
        &self.document
    }
}

pub struct PolicyBuilder {
    clock: Arc<dyn Clock>,
}

impl PolicyBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Build a policy for `https://{host}/{resource_pattern}` expiring `ttl_seconds` from now.
    pub fn build(
        &self,
        host: &str,
        resource_pattern: &str,
        ttl_seconds: u64,
    ) -> Result<AccessPolicy, AuthError> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(AuthError::InvalidPolicyInput("empty host".to_string()));
        }
        if resource_pattern.trim().is_empty() {
            return Err(AuthError::InvalidPolicyInput(
                "empty resource pattern".to_string(),
            ));
        }
        if ttl_seconds == 0 {
            return Err(AuthError::InvalidPolicyInput(
                "ttl must be positive".to_string(),
            ));
        }

        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(|ttl| self.clock.epoch_seconds().checked_add(ttl))
            .ok_or_else(|| AuthError::InvalidPolicyInput("ttl overflows expiry".to_string()))?;

        let resource = format!(
            "https://{host}/{}",
            resource_pattern.trim_start_matches('/')
        );

        let document = serde_json::to_string(&PolicyDocument {
            statement: [Statement {
                resource: &resource,
                condition: Condition {
                    date_less_than: EpochTime {
                        epoch_time: expires_at,
                    },
                },
            }],
        })
        .map_err(|e| AuthError::InvalidPolicyInput(e.to_string()))?;

        Ok(AccessPolicy {
            resource,
            expires_at,
            ttl_seconds,
            document,
        })
    }
}
