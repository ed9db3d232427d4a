// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::auth::AuthError;
use crate::signing::SignedCookieSet;
use crate::state::AppState;

/// Exchange a bearer token for CloudFront signed cookies.
///
/// Tokens longer than 16 KiB are refused unread. Denials carry no detail:
/// `401 Missing Bearer token` without a credential, `403 Forbidden` for
/// everything else.
#[utoipa::path(
    post,
    path = "/api/auth",
    tag = "Auth",
    params(
        ("Authorization" = String, Header, description = "`Bearer <ID or access token>`; tokens over 16 KiB are rejected")
    ),
    responses(
        (status = 204, description = "Signed cookies set (CloudFront-Policy, CloudFront-Signature, CloudFront-Key-Pair-Id)"),
        (status = 401, description = "No bearer credential", body = String, content_type = "text/plain"),
        (status = 403, description = "Credential rejected (including tokens over 16 KiB) or signing failed", body = String, content_type = "text/plain")
    )
)]
pub async fn issue_cookies(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let cookies = match state.issuer.issue(authorization).await {
        Ok(cookies) => cookies,
        Err(e) => return e.into_response(),
    };

    cookie_response(&cookies).unwrap_or_else(|e| {
        warn!(error_code = e.error_code(), error = %e, "Cookie headers rejected");
        e.into_response()
    })
}

fn cookie_response(cookies: &SignedCookieSet) -> Result<Response, AuthError> {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    for cookie in cookies.header_values() {
        let value = HeaderValue::from_str(&cookie).map_err(|_| {
            AuthError::SignatureFailure("cookie is not a valid header value".to_string())
        })?;
        headers.append(SET_COOKIE, value);
    }
    Ok(response)
}
