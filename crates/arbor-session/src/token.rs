//! Access token claim extraction
//!
//! The dashboard never verifies token signatures; the external auth service
//! is the issuer and the only party that cryptographically validates
//! tokens. Here the bearer token is only decoded to read its claims, so
//! signature validation is explicitly disabled. Expiry is a claim value
//! returned to the caller, never a decode error.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::SessionError;
use crate::routes::Role;

/// Wire shape of the claims inside an access token.
#[derive(Debug, Deserialize)]
struct RawClaims {
    exp: i64,
    sub: i64,
    #[serde(default)]
    roles: Vec<String>,
}

/// Decoded access-token claims. Derived, never persisted; cached keyed by
/// the exact raw token string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Subject user id.
    pub sub: i64,
    /// Roles recognized by the dashboard; unknown claim strings are dropped.
    pub roles: Vec<Role>,
}

impl AccessClaims {
    /// Whether the claimed expiry has passed.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Extract claims from an access token.
///
/// Fails with [`SessionError::MalformedToken`] only when the token cannot
/// be decoded at all; an expired token decodes successfully.
pub fn decode_claims(token: &str) -> Result<AccessClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "failed to decode access token");
            SessionError::MalformedToken
        })?;

    let raw = data.claims;
    let roles = raw
        .roles
        .iter()
        .filter_map(|r| Role::from_claim(r))
        .collect();

    Ok(AccessClaims {
        exp: raw.exp,
        sub: raw.sub,
        roles,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_token() {
        let token = test_tokens::mint(4_000_000_000, 42, vec!["admin", "viewer"]);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 4_000_000_000);
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.roles, vec![Role::Admin, Role::Viewer]);
        assert!(!claims.is_expired(3_999_999_999));
    }

    #[test]
    fn expired_token_decodes_without_error() {
        let token = test_tokens::mint(1_000, 7, vec!["manager"]);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 1_000);
        assert!(claims.is_expired(1_000));
        assert!(claims.is_expired(5_000));
    }

    #[test]
    fn unknown_roles_are_dropped() {
        let token = test_tokens::mint(4_000_000_000, 1, vec!["root", "admin", "banana"]);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.roles, vec![Role::Admin]);
    }

    #[test]
    fn missing_roles_claim_defaults_to_empty() {
        // token with no roles field at all
        #[derive(serde::Serialize)]
        struct Minimal {
            exp: i64,
            sub: i64,
        }
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &Minimal { exp: 100, sub: 5 },
            &jsonwebtoken::EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        let claims = decode_claims(&token).unwrap();
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn garbage_fails_with_malformed_token() {
        for bad in ["", "not-a-token", "a.b", "a.b.c", "ey.ey.ey"] {
            assert!(
                matches!(decode_claims(bad), Err(SessionError::MalformedToken)),
                "expected MalformedToken for {bad:?}"
            );
        }
    }
}
