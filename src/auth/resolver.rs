//! Per-request identity resolution
//!
//! Resolution order is load-bearing: authority decode is attempted first,
//! then citizen. A failed attempt falls through silently rather than raising;
//! a request with no resolvable principal proceeds unauthenticated and the
//! route handlers decide whether that is fatal.
//!
//! Resolution is stateless and done fresh per call. Nothing is cached across
//! requests.

use crate::auth::tokens::{AuthorityTokenCodec, CitizenTokenCodec};

/// The resolved identity and role for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Citizen {
        subject_id: String,
    },
    Authority {
        authority_id: String,
        community_id: String,
    },
}

impl Principal {
    /// Subject id when this is a citizen principal
    pub fn citizen_id(&self) -> Option<&str> {
        match self {
            Principal::Citizen { subject_id } => Some(subject_id),
            Principal::Authority { .. } => None,
        }
    }

    /// (authority id, community scope) when this is an authority principal
    pub fn authority_scope(&self) -> Option<(&str, &str)> {
        match self {
            Principal::Authority {
                authority_id,
                community_id,
            } => Some((authority_id, community_id)),
            Principal::Citizen { .. } => None,
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolves bearer tokens to principals using both codecs.
#[derive(Clone)]
pub struct IdentityResolver {
    authority: AuthorityTokenCodec,
    citizen: CitizenTokenCodec,
}

impl IdentityResolver {
    pub fn new(authority: AuthorityTokenCodec, citizen: CitizenTokenCodec) -> Self {
        Self { authority, citizen }
    }

    /// Resolve an `Authorization` header value to a principal, if any.
    pub fn resolve(&self, auth_header: Option<&str>) -> Option<Principal> {
        let token = extract_bearer(auth_header)?;

        if let Ok(claims) = self.authority.decode(token) {
            return Some(Principal::Authority {
                authority_id: claims.sub,
                community_id: claims.community_id,
            });
        }

        if let Ok(subject_id) = self.citizen.decode(token) {
            return Some(Principal::Citizen { subject_id });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORITY_SECRET: &str = "test-authority-secret-at-least-32-bytes!";
    const CITIZEN_SECRET: &str = "test-citizen-secret-that-is-32-bytes-min";

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(
            AuthorityTokenCodec::new(AUTHORITY_SECRET),
            CitizenTokenCodec::new(CITIZEN_SECRET),
        )
    }

    fn citizen_token(sub: &str) -> String {
        let codec = CitizenTokenCodec::new(CITIZEN_SECRET);
        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        codec.encode_for_test(CITIZEN_SECRET, sub, exp)
    }

    #[test]
    fn test_no_header_is_anonymous() {
        assert_eq!(resolver().resolve(None), None);
        assert_eq!(resolver().resolve(Some("")), None);
        assert_eq!(resolver().resolve(Some("Bearer ")), None);
        assert_eq!(resolver().resolve(Some("Basic abc")), None);
    }

    #[test]
    fn test_authority_token_resolves_as_authority() {
        // A token valid under the authority key must always resolve as an
        // authority, never fall through to citizen decoding.
        let codec = AuthorityTokenCodec::new(AUTHORITY_SECRET);
        let token = codec.issue("auth-7", "community-3", "Ward Office").unwrap();

        let principal = resolver().resolve(Some(&format!("Bearer {}", token))).unwrap();
        assert_eq!(
            principal,
            Principal::Authority {
                authority_id: "auth-7".into(),
                community_id: "community-3".into(),
            }
        );
    }

    #[test]
    fn test_citizen_token_falls_through() {
        // Invalid under the authority key, valid under the citizen key.
        let token = citizen_token("user-42");

        let principal = resolver().resolve(Some(&format!("Bearer {}", token))).unwrap();
        assert_eq!(
            principal,
            Principal::Citizen {
                subject_id: "user-42".into()
            }
        );
    }

    #[test]
    fn test_undecodable_token_is_anonymous() {
        assert_eq!(resolver().resolve(Some("Bearer not-a-jwt")), None);
    }

    #[test]
    fn test_principal_accessors() {
        let citizen = Principal::Citizen {
            subject_id: "u".into(),
        };
        assert_eq!(citizen.citizen_id(), Some("u"));
        assert_eq!(citizen.authority_scope(), None);

        let authority = Principal::Authority {
            authority_id: "a".into(),
            community_id: "c".into(),
        };
        assert_eq!(authority.citizen_id(), None);
        assert_eq!(authority.authority_scope(), Some(("a", "c")));
    }
}
