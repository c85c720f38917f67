//! Token codecs for the two identity schemes
//!
//! Both schemes sign with HS256 but use distinct symmetric keys and distinct
//! claim sets, and the formats are not self-describing: nothing in a token
//! says which scheme minted it. Disambiguation happens in the resolver by
//! attempting decodes in a fixed order.
//!
//! Security notes:
//! - Secrets shorter than 32 bytes are deterministically zero-padded to the
//!   minimum instead of rejected. That weakens the effective key; a warning
//!   is logged at construction so it is visible at startup.
//! - Authority tokens are issued with `exp == iat`. They verify only within
//!   the decoding library's default 60-second leeway window and are rejected
//!   as expired afterwards.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::types::{CivicError, Result};

/// Minimum signing key length in bytes
pub const MIN_KEY_BYTES: usize = 32;

/// Fixed role marker embedded in authority tokens
pub const AUTHORITY_ROLE: &str = "authority";

/// Zero-pad a configured secret to the minimum key length.
///
/// Short secrets are padded, not rejected, to match the deployed behavior of
/// the identity schemes this gateway fronts.
fn key_bytes(secret: &str, scheme: &str) -> Vec<u8> {
    let mut bytes = secret.as_bytes().to_vec();
    if bytes.len() < MIN_KEY_BYTES {
        warn!(
            "{} signing secret is {} bytes, zero-padding to {} (weak key)",
            scheme,
            bytes.len(),
            MIN_KEY_BYTES
        );
        bytes.resize(MIN_KEY_BYTES, 0);
    }
    bytes
}

/// Decode failure kinds surfaced to the resolver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed token: {0}")]
    Malformed(String),
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed(err.to_string()),
    }
}

/// Claims carried by citizen tokens (issued by the external identity provider)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenClaims {
    /// Provider-owned subject id
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Claims carried by locally issued authority session tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityClaims {
    /// Authority id
    pub sub: String,
    /// Assigned community scope, fixed for the lifetime of the session
    #[serde(rename = "communityId")]
    pub community_id: String,
    /// Display name
    pub name: String,
    /// Fixed role marker, always [`AUTHORITY_ROLE`]
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| CivicError::Internal(format!("System time error: {}", e)))
}

/// Verifier for citizen tokens. This gateway never mints them.
#[derive(Clone)]
pub struct CitizenTokenCodec {
    decoding: DecodingKey,
}

impl CitizenTokenCodec {
    pub fn new(secret: &str) -> Self {
        let key = key_bytes(secret, "citizen");
        Self {
            decoding: DecodingKey::from_secret(&key),
        }
    }

    /// Verify a citizen token and return the provider's subject id.
    pub fn decode(&self, token: &str) -> std::result::Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Provider tokens carry an audience this gateway does not police.
        validation.validate_aud = false;

        decode::<CitizenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(map_decode_error)
    }

    /// Mint a citizen-shaped token. Test-only: in production these come from
    /// the identity provider.
    #[cfg(test)]
    pub fn encode_for_test(&self, secret: &str, sub: &str, exp: u64) -> String {
        let key = key_bytes(secret, "citizen");
        let claims = CitizenClaims {
            sub: sub.to_string(),
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(&key)).unwrap()
    }
}

/// Signer and verifier for authority session tokens
#[derive(Clone)]
pub struct AuthorityTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthorityTokenCodec {
    pub fn new(secret: &str) -> Self {
        let key = key_bytes(secret, "authority");
        Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
        }
    }

    /// Issue a session token for an authority.
    ///
    /// `exp` is set to the issue instant, matching the deployed scheme. The
    /// token stays verifiable only for the decoder's leeway window.
    pub fn issue(&self, authority_id: &str, community_id: &str, name: &str) -> Result<String> {
        let now = unix_now()?;
        let claims = AuthorityClaims {
            sub: authority_id.to_string(),
            community_id: community_id.to_string(),
            name: name.to_string(),
            role: AUTHORITY_ROLE.to_string(),
            iat: now,
            exp: now,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| CivicError::Internal(format!("Failed to sign authority token: {}", e)))
    }

    /// Verify an authority token and return its claims.
    pub fn decode(&self, token: &str) -> std::result::Result<AuthorityClaims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<AuthorityClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    #[cfg(test)]
    pub fn encode_claims_for_test(&self, claims: &AuthorityClaims) -> String {
        encode(&Header::default(), claims, &self.encoding).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORITY_SECRET: &str = "test-authority-secret-at-least-32-bytes!";
    const CITIZEN_SECRET: &str = "test-citizen-secret-that-is-32-bytes-min";

    fn authority_codec() -> AuthorityTokenCodec {
        AuthorityTokenCodec::new(AUTHORITY_SECRET)
    }

    fn citizen_codec() -> CitizenTokenCodec {
        CitizenTokenCodec::new(CITIZEN_SECRET)
    }

    fn now() -> u64 {
        unix_now().unwrap()
    }

    #[test]
    fn test_authority_round_trip() {
        let codec = authority_codec();
        let token = codec.issue("auth-1", "community-9", "Ward Office").unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, "auth-1");
        assert_eq!(claims.community_id, "community-9");
        assert_eq!(claims.name, "Ward Office");
        assert_eq!(claims.role, AUTHORITY_ROLE);
    }

    #[test]
    fn test_issued_at_equals_expiration() {
        // The scheme sets exp == iat. jsonwebtoken's default 60s leeway means
        // a fresh token verifies; once past the leeway it is expired.
        let codec = authority_codec();
        let token = codec.issue("auth-1", "community-9", "Ward Office").unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.iat, claims.exp);

        let stale = AuthorityClaims {
            sub: "auth-1".into(),
            community_id: "community-9".into(),
            name: "Ward Office".into(),
            role: AUTHORITY_ROLE.into(),
            iat: now() - 120,
            exp: now() - 120,
        };
        let stale_token = codec.encode_claims_for_test(&stale);
        assert_eq!(codec.decode(&stale_token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let codec = authority_codec();
        let other = AuthorityTokenCodec::new("a-completely-different-32-byte-secret!!!");

        let token = codec.issue("auth-1", "community-9", "Ward Office").unwrap();
        assert_eq!(other.decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_citizen_decode() {
        let codec = citizen_codec();
        let token = codec.encode_for_test(CITIZEN_SECRET, "user-42", now() + 3600);
        assert_eq!(codec.decode(&token).unwrap(), "user-42");
    }

    #[test]
    fn test_citizen_rejects_expired() {
        let codec = citizen_codec();
        let token = codec.encode_for_test(CITIZEN_SECRET, "user-42", now().saturating_sub(120));
        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_citizen_rejects_authority_token() {
        // Different key, so the signature check fails before any claim parsing.
        let token = authority_codec()
            .issue("auth-1", "community-9", "Ward Office")
            .unwrap();
        assert_eq!(
            citizen_codec().decode(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_short_secret_padding_is_deterministic() {
        // Two codecs built from the same short secret must agree.
        let a = AuthorityTokenCodec::new("short");
        let b = AuthorityTokenCodec::new("short");

        let token = a.issue("auth-1", "community-9", "Ward Office").unwrap();
        assert!(b.decode(&token).is_ok());

        // And a padded short secret is not the same key as a different secret.
        let c = AuthorityTokenCodec::new("short2");
        assert_eq!(c.decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        match authority_codec().decode("not-a-jwt") {
            Err(TokenError::Malformed(_)) => {}
            other => panic!("expected malformed, got {:?}", other),
        }
    }
}
