//! Request authentication
//!
//! Two independent signed-token schemes share the `Authorization: Bearer`
//! header: citizen tokens minted by the external identity provider, and
//! authority session tokens minted locally at `/api/authority/login`.

mod resolver;
mod tokens;

pub use resolver::{extract_bearer, IdentityResolver, Principal};
pub use tokens::{
    AuthorityClaims, AuthorityTokenCodec, CitizenClaims, CitizenTokenCodec, TokenError,
    AUTHORITY_ROLE, MIN_KEY_BYTES,
};
