// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification and signing errors.
//!
//! Every variant is logged with its [`AuthError::error_code`], but only two
//! responses ever leave the service: `401 Missing Bearer token` when no
//! credential was presented and `403 Forbidden` for everything else.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Response body for requests without a bearer credential.
pub const MISSING_CREDENTIAL_BODY: &str = "Missing Bearer token";

/// Response body for any rejected credential or signing failure.
pub const FORBIDDEN_BODY: &str = "Forbidden";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header present
    #[error("Missing bearer credential")]
    MissingCredential,

    #[error("Token is malformed: {0}")]
    MalformedToken(&'static str),

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("No key in the provider key set matches kid {0:?}")]
    UnknownSigningKey(Option<String>),

    #[error("Provider key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("Token issuer is invalid")]
    BadIssuer,

    #[error("Token audience is invalid")]
    BadAudience,

    #[error("Signing key unavailable: {0}")]
    SigningKeyUnavailable(String),

    #[error("Policy signing failed: {0}")]
    SignatureFailure(String),

    #[error("Invalid policy input: {0}")]
    InvalidPolicyInput(String),
}

impl AuthError {
    /// Stable identifier used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::UnknownSigningKey(_) => "unknown_signing_key",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::BadSignature => "bad_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::BadIssuer => "bad_issuer",
            AuthError::BadAudience => "bad_audience",
            AuthError::SigningKeyUnavailable(_) => "signing_key_unavailable",
            AuthError::SignatureFailure(_) => "signature_failure",
            AuthError::InvalidPolicyInput(_) => "invalid_policy_input",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential => StatusCode::UNAUTHORIZED,
            _ => StatusCode::FORBIDDEN,
        }
    }

    fn public_body(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => MISSING_CREDENTIAL_BODY,
            _ => FORBIDDEN_BODY,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_body()).into_response()
    }
}
