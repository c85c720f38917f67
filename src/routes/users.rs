//! Citizen account endpoints
//!
//! Thin proxies over the external identity provider. No citizen credentials
//! or sessions are stored here; the provider owns the account lifecycle and
//! mints the tokens that later arrive as `Authorization: Bearer`.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::identity::AuthSession;
use crate::routes::views::AuthView;
use crate::routes::{
    empty_response, error_response, error_to_response, json_response, parse_json_body, FullBody,
};
use crate::server::AppState;

#[derive(Deserialize)]
struct CredentialsRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct EmailRequest {
    email: Option<String>,
}

fn auth_view(session: AuthSession) -> AuthView {
    AuthView {
        token: session.access_token,
        user_id: session.user_id,
        email: session.email,
    }
}

/// POST /api/users/register
pub async fn handle_register(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (email, password) = match (body.email, body.password) {
        (Some(e), Some(p)) => (e, p),
        _ => return error_response(StatusCode::BAD_REQUEST, "email and password are required"),
    };

    match state.identity.sign_up(&email, &password).await {
        Ok(session) => {
            info!("Registered citizen account for {}", email);
            json_response(StatusCode::OK, &auth_view(session))
        }
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/users/login
pub async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (email, password) = match (body.email, body.password) {
        (Some(e), Some(p)) => (e, p),
        _ => return error_response(StatusCode::BAD_REQUEST, "email and password are required"),
    };

    match state.identity.sign_in(&email, &password).await {
        Ok(session) => json_response(StatusCode::OK, &auth_view(session)),
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/users/forgot-password
pub async fn handle_forgot_password(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let body: EmailRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let email = match body.email {
        Some(e) => e,
        None => return error_response(StatusCode::BAD_REQUEST, "email is required"),
    };

    match state.identity.recover_password(&email).await {
        Ok(()) => empty_response(StatusCode::OK),
        Err(e) => error_to_response(&e),
    }
}
