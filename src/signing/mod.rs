// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signing Module
//!
//! Turns a verified caller into CloudFront signed cookies.
//!
//! 1. [`PolicyBuilder`] renders a custom policy for the protected path
//! 2. [`SigningKeyCache`] supplies the edge private key from the secret store
//! 3. [`CookieSigner`] signs the policy (RSA-SHA1) and emits the three cookies

pub mod cookies;
pub mod key_cache;
pub mod policy;
pub mod secrets;

pub use cookies::{
    cookie_safe_decode, cookie_safe_encode, CookieAttributes, CookieSigner, SignedCookie,
    SignedCookieSet,
};
pub use key_cache::{SigningKeyBundle, SigningKeyCache};
pub use policy::{AccessPolicy, PolicyBuilder};
pub use secrets::{ExtensionSecretStore, SecretStore, SecretStoreError, SecretValue};
