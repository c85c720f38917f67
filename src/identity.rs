//! Identity-provider client
//!
//! Citizens authenticate against Supabase Auth; this gateway proxies signup,
//! password-grant login and password recovery. Non-2xx responses surface the
//! provider's `msg` field as the failure detail - that string is treated as
//! already user-safe, unlike internal error text which never leaves the
//! gateway.

use serde::Serialize;
use tracing::debug;

use crate::types::{CivicError, Result};

/// Provider response, normalized
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

/// HTTP client for the external identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    /// Register a new citizen account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.post_auth("/auth/v1/signup", &Credentials { email, password })
            .await
    }

    /// Password-grant login.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.post_auth(
            "/auth/v1/token?grant_type=password",
            &Credentials { email, password },
        )
        .await
    }

    /// Trigger a password recovery email. The provider owns delivery.
    pub async fn recover_password(&self, email: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/auth/v1/recover", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&RecoverRequest { email })
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CivicError::UpstreamAuth(provider_msg(&body)));
        }

        Ok(())
    }

    async fn post_auth<B: Serialize>(&self, path: &str, body: &B) -> Result<AuthSession> {
        debug!("Identity provider call: {}", path);

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(CivicError::UpstreamAuth(provider_msg(&text)));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| CivicError::UpstreamAuth(format!("Unreadable provider response: {}", e)))?;

        Ok(AuthSession {
            access_token: json
                .get("access_token")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            user_id: json
                .pointer("/user/id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            email: json
                .pointer("/user/email")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

/// Pull the provider's `msg` field out of an error body, falling back to the
/// raw body when the shape is unexpected.
fn provider_msg(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
