//! Authority endpoints
//!
//! Authorities are provisioned out of band and log in with a (name,
//! unique_code) pair; a successful login mints a short-lived session token
//! scoped to the authority's assigned community. Every other endpoint here
//! requires that token.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::routes::views::IssueView;
use crate::routes::{
    error_response, error_to_response, json_response, parse_json_body, resolve_principal, FullBody,
};
use crate::server::AppState;

#[derive(Deserialize)]
struct LoginRequest {
    name: Option<String>,
    unique_code: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    authority_id: String,
    name: String,
}

#[derive(Deserialize)]
struct StatusRequest {
    status: Option<String>,
}

/// POST /api/authority/login
pub async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (name, unique_code) = match (body.name, body.unique_code) {
        (Some(n), Some(c)) => (n, c),
        _ => return error_response(StatusCode::BAD_REQUEST, "name and unique_code are required"),
    };

    let authority = match state.store.find_authority(&name, &unique_code).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            // Wrong name and wrong code are indistinguishable to the caller.
            warn!("Failed authority login for '{}'", name);
            return error_response(StatusCode::BAD_REQUEST, "Invalid credentials");
        }
        Err(e) => return error_to_response(&e),
    };

    let token = match state.authority_codec.issue(
        &authority.id,
        &authority.assigned_community_id,
        &authority.name,
    ) {
        Ok(t) => t,
        Err(e) => return error_to_response(&e),
    };

    info!(
        "Authority '{}' logged in (community {})",
        authority.name, authority.assigned_community_id
    );

    json_response(
        StatusCode::OK,
        &LoginResponse {
            token,
            authority_id: authority.id,
            name: authority.name,
        },
    )
}

/// GET /api/authority/issues
pub async fn handle_issues(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let principal = resolve_principal(&req, &state);
    let community_id = match principal.as_ref().and_then(|p| p.authority_scope()) {
        Some((_, community)) => community.to_string(),
        None => return error_response(StatusCode::FORBIDDEN, "Authority token required"),
    };

    match state.pipeline.by_community(&community_id).await {
        Ok(records) => {
            let views: Vec<IssueView> = records.iter().map(IssueView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}

/// PUT /api/authority/issues/{id}/status
pub async fn handle_update_status(
    req: Request<Incoming>,
    state: Arc<AppState>,
    issue_id: &str,
) -> Response<FullBody> {
    let principal = match resolve_principal(&req, &state) {
        Some(p) if p.authority_scope().is_some() => p,
        _ => return error_response(StatusCode::FORBIDDEN, "Authority token required"),
    };

    let body: StatusRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let status = match body.status {
        Some(s) => s,
        None => return error_response(StatusCode::BAD_REQUEST, "status is required"),
    };

    match state
        .pipeline
        .update_status(issue_id, &status, &principal)
        .await
    {
        Ok(record) => json_response(StatusCode::OK, &IssueView::from(&record)),
        Err(e) => error_to_response(&e),
    }
}
