// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token verification against the Cognito user pool.
//!
//! ## Auth Flow
//!
//! 1. Frontend completes the authorization-code + PKCE exchange with Cognito
//! 2. Frontend sends `Authorization: Bearer <ID token>` to `/api/auth`
//! 3. This service:
//!    - Resolves the token's `kid` against the cached user pool JWKS
//!    - Verifies the RS256 signature
//!    - Checks `exp`, `nbf`, `iss` and the audience for the token type
//!
//! ## Security
//!
//! - Only RS256 is accepted (no `none`, no HMAC)
//! - JWKS is fetched via HTTPS and cached for 12 hours
//! - No claim is acted on before the signature verified

pub mod claims;
pub mod error;
pub mod jwks;
pub mod verifier;

pub use claims::{Audience, TokenHeader, TokenUse, ValidatedClaims};
pub use error::AuthError;
pub use jwks::{HttpKeySetSource, JwksCache, KeySetSource, PublicKeyRecord};
pub use verifier::{ParsedToken, TokenVerifier};
