//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection and manual
//! (method, path) routing. All shared state lives in `AppState` behind an
//! `Arc`; per-request identity is resolved inside the handlers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::annotate::GeotagAnnotator;
use crate::auth::{AuthorityTokenCodec, CitizenTokenCodec, IdentityResolver};
use crate::config::Args;
use crate::db::RecordStore;
use crate::identity::IdentityClient;
use crate::objectstore::SupabaseStorage;
use crate::pipeline::IssuePipeline;
use crate::routes;
use crate::types::{CivicError, Result};

type FullBody = Full<Bytes>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn RecordStore>,
    /// Which store backs this instance, for the health endpoint
    pub store_kind: &'static str,
    /// Resolves bearer tokens to principals (authority first, then citizen)
    pub resolver: IdentityResolver,
    /// Mints authority session tokens at login
    pub authority_codec: AuthorityTokenCodec,
    /// Proxy to the external identity provider
    pub identity: IdentityClient,
    pub pipeline: IssuePipeline,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn RecordStore>, store_kind: &'static str) -> Result<Self> {
        let authority_codec = AuthorityTokenCodec::new(&args.authority_jwt_secret);
        let resolver = IdentityResolver::new(
            authority_codec.clone(),
            CitizenTokenCodec::new(&args.citizen_jwt_secret),
        );
        let identity = IdentityClient::new(&args.supabase_url, &args.supabase_anon_key);
        let uploads = SupabaseStorage::new(
            &args.supabase_url,
            &args.supabase_service_role_key,
            &args.storage_bucket,
        );
        let pipeline = IssuePipeline::new(
            Arc::clone(&store),
            GeotagAnnotator::new()?,
            Arc::new(uploads),
        );

        Ok(Self {
            args,
            store,
            store_kind,
            resolver,
            authority_codec,
            identity,
            pipeline,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| CivicError::Config(format!("Failed to bind {}: {}", state.args.listen, e)))?;

    info!("CivicSnap listening on {}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Citizen accounts (proxied to the identity provider)
        (Method::POST, "/api/users/register") => {
            routes::users::handle_register(req, Arc::clone(&state)).await
        }
        (Method::POST, "/api/users/login") => {
            routes::users::handle_login(req, Arc::clone(&state)).await
        }
        (Method::POST, "/api/users/forgot-password") => {
            routes::users::handle_forgot_password(req, Arc::clone(&state)).await
        }

        // Issues
        (Method::POST, "/api/issues") => {
            routes::issues::handle_create(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/issues") => routes::issues::handle_feed(req, Arc::clone(&state)).await,

        (Method::POST, p) if p.starts_with("/api/issues/") && p.ends_with("/upvote") => {
            match issue_id_from(p, "/upvote") {
                Some(id) => routes::issues::handle_upvote(req, Arc::clone(&state), &id).await,
                None => not_found_response(&path),
            }
        }
        (Method::POST, p) if p.starts_with("/api/issues/") && p.ends_with("/comment") => {
            match issue_id_from(p, "/comment") {
                Some(id) => routes::issues::handle_comment(req, Arc::clone(&state), &id).await,
                None => not_found_response(&path),
            }
        }
        (Method::GET, p) if p.starts_with("/api/issues/") && p.ends_with("/comments") => {
            match issue_id_from(p, "/comments") {
                Some(id) => routes::issues::handle_comments(Arc::clone(&state), &id).await,
                None => not_found_response(&path),
            }
        }

        // Authority
        (Method::POST, "/api/authority/login") => {
            routes::authority::handle_login(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/authority/issues") => {
            routes::authority::handle_issues(req, Arc::clone(&state)).await
        }
        (Method::PUT, p) if p.starts_with("/api/authority/issues/") && p.ends_with("/status") => {
            match p
                .strip_prefix("/api/authority/issues/")
                .and_then(|rest| rest.strip_suffix("/status"))
                .filter(|id| !id.is_empty() && !id.contains('/'))
            {
                Some(id) => {
                    let id = id.to_string();
                    routes::authority::handle_update_status(req, Arc::clone(&state), &id).await
                }
                None => not_found_response(&path),
            }
        }

        // News feed
        (Method::GET, "/api/news") => routes::news::handle_latest_news(Arc::clone(&state)).await,

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Extract the issue id from `/api/issues/{id}{suffix}`.
fn issue_id_from(path: &str, suffix: &str) -> Option<String> {
    path.strip_prefix("/api/issues/")
        .and_then(|rest| rest.strip_suffix(suffix))
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(str::to_string)
}

fn preflight_response() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(format!(
            "{{\"error\":\"Not found: {}\"}}",
            path
        ))))
        .unwrap()
}
