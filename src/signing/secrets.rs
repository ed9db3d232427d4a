// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret store access for the CloudFront signing key.
//!
//! In production the secret is read through the Parameters and Secrets
//! extension that runs next to the function, which proxies Secrets Manager
//! `GetSecretValue` on `localhost:2773` and handles request signing for us.

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretBox, SecretString};
use serde::Deserialize;
use url::Url;

/// Staging label of the version currently in use.
pub const CURRENT_VERSION_STAGE: &str = "AWSCURRENT";

/// Header the extension requires, carrying the execution environment's session token.
pub const SECRETS_TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("secret store request failed: {0}")]
    Request(String),

    #[error("secret store returned {status}")]
    Status { status: u16 },

    #[error("secret store response was invalid: {0}")]
    InvalidResponse(String),

    #[error("secret has neither a string nor a binary value")]
    Empty,
}

/// Current value of a secret, as returned by the store.
#[derive(Debug)]
pub struct SecretValue {
    pub secret_string: Option<SecretString>,
    pub secret_binary: Option<SecretBox<Vec<u8>>>,
    pub version_id: Option<String>,
}

impl SecretValue {
    pub fn from_string(value: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            secret_string: Some(SecretString::from(value.into())),
            secret_binary: None,
            version_id,
        }
    }

    pub fn from_binary(value: Vec<u8>, version_id: Option<String>) -> Self {
        Self {
            secret_string: None,
            secret_binary: Some(SecretBox::new(Box::new(value))),
            version_id,
        }
    }

    /// The secret as text; a binary value must be UTF-8.
    pub fn text(&self) -> Result<SecretString, SecretStoreError> {
        if let Some(text) = &self.secret_string {
            return Ok(SecretString::from(text.expose_secret().to_owned()));
        }
        let binary = self.secret_binary.as_ref().ok_or(SecretStoreError::Empty)?;
        let text = String::from_utf8(binary.expose_secret().clone()).map_err(|_| {
            SecretStoreError::InvalidResponse("binary secret is not UTF-8".to_string())
        })?;
        Ok(SecretString::from(text))
    }
}

/// Read access to the current version of a secret.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn current_secret(&self, secret_id: &str) -> Result<SecretValue, SecretStoreError>;
}

/// `GetSecretValue` response body.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueResponse {
    #[serde(default)]
    secret_string: Option<SecretString>,
    /// Base64 encoded
    #[serde(default)]
    secret_binary: Option<String>,
    #[serde(default)]
    version_id: Option<String>,
}

/// Secrets Manager via the local Parameters and Secrets extension.
#[derive(Debug)]
pub struct ExtensionSecretStore {
    base_url: Url,
    session_token: Option<SecretString>,
    client: reqwest::Client,
}

impl ExtensionSecretStore {
    pub fn new(base_url: Url, session_token: Option<String>, client: reqwest::Client) -> Self {
        Self {
            base_url,
            session_token: session_token.map(SecretString::from),
            client,
        }
    }

    fn request_url(&self, secret_id: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/secretsmanager/get");
        url.query_pairs_mut()
            .clear()
            .append_pair("secretId", secret_id)
            .append_pair("versionStage", CURRENT_VERSION_STAGE);
        url
    }
}

#[async_trait]
impl SecretStore for ExtensionSecretStore {
    async fn current_secret(&self, secret_id: &str) -> Result<SecretValue, SecretStoreError> {
        let mut request = self.client.get(self.request_url(secret_id));
        if let Some(token) = &self.session_token {
            request = request.header(SECRETS_TOKEN_HEADER, token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SecretStoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SecretStoreError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: GetSecretValueResponse = response
            .json()
            .await
            .map_err(|e| SecretStoreError::InvalidResponse(e.to_string()))?;

        match (body.secret_string, body.secret_binary) {
            (Some(text), _) => Ok(SecretValue {
                secret_string: Some(text),
                secret_binary: None,
                version_id: body.version_id,
            }),
            (None, Some(encoded)) => {
                let bytes = Base64::decode_vec(&encoded).map_err(|_| {
                    SecretStoreError::InvalidResponse("SecretBinary is not base64".to_string())
                })?;
                Ok(SecretValue::from_binary(bytes, body.version_id))
            }
            (None, None) => Err(SecretStoreError::Empty),
        }
    }
}
