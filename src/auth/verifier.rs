// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. structure (three non-empty segments, decodable header and payload)
//! 2. algorithm (`RS256` only)
//! 3. key lookup by `kid` through [`JwksCache`]
//! 4. signature over `header.payload`
//! 5. `exp` / `nbf`
//! 6. `iss`
//! 7. audience (`aud` for ID tokens, `client_id` for access tokens)
//!
//! Claims are decoded in step 1 but none is acted on until step 4 passed.

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::jwk::AlgorithmParameters;
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_2048_8192_SHA256};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::claims::{TokenHeader, ValidatedClaims};
use super::error::AuthError;
use super::jwks::{JwksCache, PublicKeyRecord};
use crate::clock::Clock;

/// The only algorithm the user pool signs with.
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Tokens above this size are rejected before any decoding (16KB). Leaves
/// room for users in many `cognito:groups`.
pub const MAX_TOKEN_SIZE_BYTES: usize = 16 * 1024;

/// A compact token split into its parts. Nothing in it is trusted yet.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    pub header: TokenHeader,
    pub claims: ValidatedClaims,
    pub signature: Vec<u8>,
    /// `base64url(header) "." base64url(payload)`, exactly as received.
    pub signing_input: &'a str,
}

impl<'a> ParsedToken<'a> {
    pub fn parse(token: &'a str) -> Result<Self, AuthError> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            return Err(AuthError::MalformedToken("token exceeds size limit"));
        }

        let mut segments = token.split('.');
        let (header_b64, payload_b64, signature_b64) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
                (h, p, s)
            }
            _ => return Err(AuthError::MalformedToken("expected three non-empty segments")),
        };

        let header: TokenHeader =
            decode_json(header_b64, "header is not base64url", "header is not JSON")?;
        let claims: ValidatedClaims =
            decode_json(payload_b64, "payload is not base64url", "payload is not JSON")?;
        let signature = Base64UrlUnpadded::decode_vec(signature_b64)
            .map_err(|_| AuthError::MalformedToken("signature is not base64url"))?;

        Ok(Self {
            header,
            claims,
            signature,
            signing_input: &token[..header_b64.len() + 1 + payload_b64.len()],
        })
    }
}

fn decode_json<T: DeserializeOwned>(
    segment: &str,
    not_base64: &'static str,
    not_json: &'static str,
) -> Result<T, AuthError> {
    let bytes =
        Base64UrlUnpadded::decode_vec(segment).map_err(|_| AuthError::MalformedToken(not_base64))?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken(not_json))
}

/// Verifies Cognito ID and access tokens.
pub struct TokenVerifier {
    jwks: Arc<JwksCache>,
    clock: Arc<dyn Clock>,
    issuer: String,
    client_id: String,
}

impl TokenVerifier {
    pub fn new(
        jwks: Arc<JwksCache>,
        clock: Arc<dyn Clock>,
        issuer: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            jwks,
            clock,
            issuer: issuer.into(),
            client_id: client_id.into(),
        }
    }

    pub fn jwks(&self) -> &Arc<JwksCache> {
        &self.jwks
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<ValidatedClaims, AuthError> {
        let parsed = ParsedToken::parse(token)?;

        if parsed.header.alg != SUPPORTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(parsed.header.alg));
        }

        let kid = parsed
            .header
            .kid
            .as_deref()
            .ok_or(AuthError::UnknownSigningKey(None))?;
        let jwk = self.jwks.resolve(kid, false).await?;

        verify_signature(&jwk, parsed.signing_input, &parsed.signature)?;

        let claims = parsed.claims;
        let now = self.clock.epoch_seconds();

        let exp = claims
            .exp
            .ok_or(AuthError::MalformedToken("missing exp claim"))?;
        if now >= exp {
            return Err(AuthError::TokenExpired);
        }
        if let Some(nbf) = claims.nbf {
            if now < nbf {
                return Err(AuthError::TokenNotYetValid);
            }
        }

        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(AuthError::BadIssuer);
        }

        if !claims.is_for_client(&self.client_id) {
            return Err(AuthError::BadAudience);
        }

        debug!(kid, sub = ?claims.sub, token_use = ?claims.token_use, "token verified");
        Ok(claims)
    }
}

/// RSASSA-PKCS1-v1_5 with SHA-256 against the JWK's modulus and exponent.
fn verify_signature(
    jwk: &PublicKeyRecord,
    signing_input: &str,
    signature: &[u8],
) -> Result<(), AuthError> {
    let AlgorithmParameters::RSA(rsa) = &jwk.algorithm else {
        return Err(AuthError::BadSignature);
    };

    let n = Base64UrlUnpadded::decode_vec(&rsa.n).map_err(|_| AuthError::BadSignature)?;
    let e = Base64UrlUnpadded::decode_vec(&rsa.e).map_err(|_| AuthError::BadSignature)?;

    RsaPublicKeyComponents { n: &n, e: &e }
        .verify(&RSA_PKCS1_2048_8192_SHA256, signing_input.as_bytes(), signature)
        .map_err(|_| AuthError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ManualClock, StaticKeySetSource};
    use chrono::TimeDelta;
    use serde_json::json;

    struct Fixture {
        verifier: TokenVerifier,
        source: Arc<StaticKeySetSource>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(StaticKeySetSource::new(testing::jwks()));
        let clock = Arc::new(ManualClock::default());
        let jwks = Arc::new(JwksCache::new(source.clone(), clock.clone()));
        let verifier = TokenVerifier::new(jwks, clock.clone(), testing::ISSUER, testing::CLIENT_ID);
        Fixture {
            verifier,
            source,
            clock,
        }
    }

    fn with_claims(patch: serde_json::Value) -> String {
        let mut claims = testing::id_token_claims();
        for (k, v) in patch.as_object().unwrap() {
            if v.is_null() {
                claims.as_object_mut().unwrap().remove(k);
            } else {
                claims[k] = v.clone();
            }
        }
        testing::mint(testing::rs256_header(testing::KID), claims, testing::provider_key())
    }

    #[tokio::test]
    async fn accepts_valid_id_token() {
        let f = fixture();
        let claims = f.verifier.verify(&testing::valid_id_token()).await.unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.iss.as_deref(), Some(testing::ISSUER));
    }

    #[tokio::test]
    async fn accepts_access_token_with_matching_client_id() {
        let f = fixture();
        let token = with_claims(json!({
            "token_use": "access",
            "aud": null,
            "client_id": testing::CLIENT_ID
        }));
        assert!(f.verifier.verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_malformed_structure() {
        let f = fixture();
        let valid = testing::valid_id_token();
        let (head, _) = valid.rsplit_once('.').unwrap();

        for token in [
            String::new(),
            "abc".to_string(),
            "a.b".to_string(),
            format!("{head}."),
            format!("..{}", "sig"),
            format!("{valid}.extra"),
            "!!!.???.sig".to_string(),
        ] {
            let err = f.verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, AuthError::MalformedToken(_)), "{token}: {err}");
        }
        assert_eq!(f.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn rejects_oversized_token_before_decoding() {
        let f = fixture();
        let token = with_claims(json!({ "cognito:groups": groups(2_000) }));
        assert!(token.len() > MAX_TOKEN_SIZE_BYTES);

        let err = f.verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken("token exceeds size limit")));
        assert_eq!(f.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn accepts_token_with_many_groups() {
        let f = fixture();
        let token = with_claims(json!({ "cognito:groups": groups(600) }));
        assert!(token.len() > 8 * 1024 && token.len() <= MAX_TOKEN_SIZE_BYTES, "{}", token.len());

        let claims = f.verifier.verify(&token).await.unwrap();
        assert_eq!(claims.extra["cognito:groups"].as_array().map(Vec::len), Some(600));
    }

    fn groups(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("group-{i:04}")).collect()
    }

    #[tokio::test]
    async fn rejects_other_algorithms_regardless_of_signature() {
        let f = fixture();
        for alg in ["none", "HS256", "RS512", "ES256", "rs256"] {
            let token = testing::mint(
                json!({"alg": alg, "kid": testing::KID}),
                testing::id_token_claims(),
                testing::provider_key(),
            );
            let err = f.verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, AuthError::UnsupportedAlgorithm(ref a) if a == alg), "{alg}");
        }
        assert_eq!(f.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn rejects_token_from_key_outside_the_set() {
        let f = fixture();

        let unknown_kid = testing::mint(
            testing::rs256_header("attacker-key"),
            testing::id_token_claims(),
            testing::other_key(),
        );
        assert!(matches!(
            f.verifier.verify(&unknown_kid).await,
            Err(AuthError::UnknownSigningKey(_))
        ));

        let spoofed_kid = testing::mint(
            testing::rs256_header(testing::KID),
            testing::id_token_claims(),
            testing::other_key(),
        );
        assert!(matches!(
            f.verifier.verify(&spoofed_kid).await,
            Err(AuthError::BadSignature)
        ));
    }

    #[tokio::test]
    async fn rejects_missing_kid_without_fetching() {
        let f = fixture();
        let token = testing::mint(
            json!({"alg": "RS256"}),
            testing::id_token_claims(),
            testing::provider_key(),
        );
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::UnknownSigningKey(None))
        ));
        assert_eq!(f.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn rejects_tampered_payload() {
        let f = fixture();
        let token = testing::valid_id_token();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = Base64UrlUnpadded::encode_string(
            serde_json::to_vec(&with_claims_value(json!({"sub": "admin"}))).unwrap().as_slice(),
        );
        parts[1] = &forged;
        let tampered = parts.join(".");
        assert!(matches!(
            f.verifier.verify(&tampered).await,
            Err(AuthError::BadSignature)
        ));
    }

    fn with_claims_value(patch: serde_json::Value) -> serde_json::Value {
        let mut claims = testing::id_token_claims();
        for (k, v) in patch.as_object().unwrap() {
            claims[k] = v.clone();
        }
        claims
    }

    #[tokio::test]
    async fn expiry_is_exclusive() {
        let f = fixture();
        let token = with_claims(json!({"exp": testing::NOW + 60}));

        f.clock.advance(TimeDelta::seconds(59));
        assert!(f.verifier.verify(&token).await.is_ok());

        f.clock.advance(TimeDelta::seconds(1));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn expired_token_fails_even_with_valid_signature_and_issuer() {
        let f = fixture();
        for exp in [testing::NOW, testing::NOW - 1, 0] {
            let token = with_claims(json!({"exp": exp}));
            assert!(matches!(
                f.verifier.verify(&token).await,
                Err(AuthError::TokenExpired)
            ));
        }
    }

    #[tokio::test]
    async fn missing_exp_is_rejected() {
        let f = fixture();
        let token = with_claims(json!({"exp": null}));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[tokio::test]
    async fn not_before_is_enforced() {
        let f = fixture();
        let token = with_claims(json!({"nbf": testing::NOW + 30}));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::TokenNotYetValid)
        ));

        f.clock.advance(TimeDelta::seconds(30));
        assert!(f.verifier.verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_issuer() {
        let f = fixture();
        let token = with_claims(json!({"iss": "https://cognito-idp.us-east-1.amazonaws.com/other"}));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::BadIssuer)
        ));

        let token = with_claims(json!({"iss": null}));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::BadIssuer)
        ));
    }

    #[tokio::test]
    async fn rejects_audience_for_another_client() {
        let f = fixture();
        let token = with_claims(json!({"aud": "someone-elses-client"}));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::BadAudience)
        ));

        // An access token carrying the right `aud` but wrong `client_id`.
        let token = with_claims(json!({
            "token_use": "access",
            "aud": testing::CLIENT_ID,
            "client_id": "someone-elses-client"
        }));
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::BadAudience)
        ));
    }

    #[tokio::test]
    async fn signature_is_checked_before_claims() {
        let f = fixture();
        // Expired, wrong issuer and wrong audience, but signed by a stranger:
        // the signature failure must be what surfaces.
        let claims = json!({
            "iss": "https://evil.example",
            "aud": "nope",
            "token_use": "id",
            "exp": 1
        });
        let token = testing::mint(testing::rs256_header(testing::KID), claims, testing::other_key());
        assert!(matches!(
            f.verifier.verify(&token).await,
            Err(AuthError::BadSignature)
        ));
    }

    #[tokio::test]
    async fn key_set_outage_surfaces_as_unavailable() {
        let f = fixture();
        f.source.fail_with("dns failure");
        assert!(matches!(
            f.verifier.verify(&testing::valid_id_token()).await,
            Err(AuthError::KeySetUnavailable(_))
        ));
    }

    #[test]
    fn parse_keeps_exact_signing_input() {
        let token = testing::valid_id_token();
        let parsed = ParsedToken::parse(&token).unwrap();
        let (expected, _) = token.rsplit_once('.').unwrap();
        assert_eq!(parsed.signing_input, expected);
        assert_eq!(parsed.header.kid.as_deref(), Some(testing::KID));
        assert!(!parsed.signature.is_empty());
    }
}
