// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Edge Cookie Issuer - CloudFront signed cookies for Cognito users
//!
//! Verifies a bearer token issued by a Cognito user pool and answers with the
//! three CloudFront signed cookies that unlock the protected path prefix.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification against the user pool JWKS
//! - `signing` - Policy building, signing key cache and cookie signing
//! - `issuer` - Per-request flow from bearer credential to cookies

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod issuer;
pub mod signing;
pub mod state;

#[cfg(test)]
mod testing;
