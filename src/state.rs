// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::issuer::CookieIssuer;

/// Shared across requests. The issuer owns both key caches, so they live as
/// long as the process.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<CookieIssuer>,
}

impl AppState {
    pub fn new(issuer: CookieIssuer) -> Self {
        Self {
            issuer: Arc::new(issuer),
        }
    }
}
