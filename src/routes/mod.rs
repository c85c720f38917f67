//! HTTP routes for the CivicSnap gateway

pub mod authority;
pub mod health;
pub mod issues;
pub mod news;
pub mod users;
mod views;

pub use health::{health_check, version_info};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::server::AppState;
use crate::types::CivicError;

pub(crate) type FullBody = Full<Bytes>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub(crate) fn empty_response(status: StatusCode) -> Response<FullBody> {
    Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<FullBody> {
    json_response(
        status,
        &ErrorBody {
            error: message.to_string(),
        },
    )
}

/// Map a pipeline/store error to its HTTP response.
pub(crate) fn error_to_response(err: &CivicError) -> Response<FullBody> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, &err.to_string())
}

pub(crate) fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Resolve the request's principal, or `None` for anonymous.
pub(crate) fn resolve_principal(req: &Request<Incoming>, state: &AppState) -> Option<Principal> {
    state.resolver.resolve(get_auth_header(req))
}

/// Read and deserialize a JSON request body.
pub(crate) async fn parse_json_body<T>(req: Request<Incoming>) -> Result<T, Response<FullBody>>
where
    T: for<'de> Deserialize<'de>,
{
    let body_bytes = match req.into_body().collect().await {
        Ok(b) => b.to_bytes(),
        Err(e) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read body: {}", e),
            ))
        }
    };

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON body: {}", e))
    })
}

/// Extract one query parameter from a raw query string. Form-encoded `+`
/// becomes a space before percent-decoding.
pub(crate) fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == name {
                let value = value.replace('+', " ");
                return Some(urlencoding::decode(&value).unwrap_or_default().into_owned());
            }
        }
    }
    None
}
