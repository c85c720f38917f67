//! Issue endpoints
//!
//! `POST /api/issues` accepts a multipart form: the photo under `image` plus
//! text fields for description, tags and location. Numeric fields that fail
//! to parse are treated as absent rather than rejected; mobile clients send
//! empty strings for unknown coordinates.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use http_body_util::BodyExt;

use crate::pipeline::NewIssue;
use crate::routes::views::{CommentView, IssueView};
use crate::routes::{
    empty_response, error_response, error_to_response, json_response, parse_json_body, query_param,
    resolve_principal, FullBody,
};
use crate::server::AppState;

#[derive(Deserialize)]
struct CommentRequest {
    comment_text: Option<String>,
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse().ok())
}

/// Coordinates are a pair; a lone latitude or longitude is dropped so the
/// stored location is either complete or absent.
fn parse_coordinates(lat_raw: Option<&str>, lon_raw: Option<&str>) -> (Option<f64>, Option<f64>) {
    match (parse_coordinate(lat_raw), parse_coordinate(lon_raw)) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => (None, None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Read the multipart form into a `NewIssue`.
async fn read_multipart(
    req: Request<Incoming>,
    max_bytes: usize,
) -> Result<NewIssue, Response<FullBody>> {
    let boundary = req
        .headers()
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| {
            error_response(StatusCode::BAD_REQUEST, "Expected multipart/form-data body")
        })?;

    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(max_bytes as u64));
    let mut multipart = Multipart::with_constraints(
        req.into_body().into_data_stream(),
        boundary,
        constraints,
    );

    let mut image: Option<(Vec<u8>, String)> = None;
    let mut description = None;
    let mut tags_raw = None;
    let mut latitude_raw = None;
    let mut longitude_raw = None;
    let mut road = None;
    let mut city = None;
    let mut country = None;
    let mut community_id = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("Malformed multipart body: {}", e),
                ))
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "image/jpeg".to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    error_response(
                        StatusCode::BAD_REQUEST,
                        &format!("Failed to read image: {}", e),
                    )
                })?;
                image = Some((bytes.to_vec(), content_type));
            }
            Some(other) => {
                let other = other.to_string();
                let text = field.text().await.map_err(|e| {
                    error_response(
                        StatusCode::BAD_REQUEST,
                        &format!("Failed to read field '{}': {}", other, e),
                    )
                })?;
                match other.as_str() {
                    "description" => description = Some(text),
                    "tags" => tags_raw = Some(text),
                    "latitude" => latitude_raw = Some(text),
                    "longitude" => longitude_raw = Some(text),
                    "road" => road = Some(text),
                    "city" => city = Some(text),
                    "country" => country = Some(text),
                    "community_id" => community_id = Some(text),
                    _ => warn!("Ignoring unknown multipart field '{}'", other),
                }
            }
            None => {}
        }
    }

    let (image, content_type) = image
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "image part is required"))?;
    let description = description
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "description part is required"))?;

    let (latitude, longitude) =
        parse_coordinates(latitude_raw.as_deref(), longitude_raw.as_deref());

    Ok(NewIssue {
        image,
        content_type,
        description,
        tags: tags_raw.as_deref().map(parse_tags).unwrap_or_default(),
        latitude,
        longitude,
        road: non_blank(road),
        city: non_blank(city),
        country: non_blank(country),
        community_id: non_blank(community_id),
    })
}

/// POST /api/issues
pub async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    // 401 before the body is touched; an anonymous upload is never read.
    let principal = match resolve_principal(&req, &state) {
        Some(p) => p,
        None => return error_response(StatusCode::UNAUTHORIZED, "Authentication required"),
    };

    let input = match read_multipart(req, state.args.max_upload_bytes).await {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match state.pipeline.create(&principal, input).await {
        Ok(issue) => json_response(StatusCode::OK, &IssueView::from_issue(&issue, &[])),
        Err(e) => error_to_response(&e),
    }
}

/// GET /api/issues?search=
pub async fn handle_feed(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let search = query_param(req.uri().query(), "search");

    match state.pipeline.feed(search.as_deref()).await {
        Ok(records) => {
            let views: Vec<IssueView> = records.iter().map(IssueView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/issues/{id}/upvote
pub async fn handle_upvote(
    req: Request<Incoming>,
    state: Arc<AppState>,
    issue_id: &str,
) -> Response<FullBody> {
    let subject_id = match resolve_principal(&req, &state) {
        Some(p) => match p.citizen_id() {
            Some(id) => id.to_string(),
            None => return error_response(StatusCode::UNAUTHORIZED, "Citizen token required"),
        },
        None => return error_response(StatusCode::UNAUTHORIZED, "Authentication required"),
    };

    match state.pipeline.upvote(issue_id, &subject_id).await {
        Ok(()) => empty_response(StatusCode::OK),
        Err(e) => error_to_response(&e),
    }
}

/// POST /api/issues/{id}/comment
pub async fn handle_comment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    issue_id: &str,
) -> Response<FullBody> {
    let subject_id = match resolve_principal(&req, &state) {
        Some(p) => match p.citizen_id() {
            Some(id) => id.to_string(),
            None => return error_response(StatusCode::UNAUTHORIZED, "Citizen token required"),
        },
        None => return error_response(StatusCode::UNAUTHORIZED, "Authentication required"),
    };

    let body: CommentRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let text = body.comment_text.unwrap_or_default();

    match state.pipeline.add_comment(issue_id, &subject_id, &text).await {
        Ok(record) => json_response(StatusCode::OK, &IssueView::from(&record)),
        Err(e) => error_to_response(&e),
    }
}

/// GET /api/issues/{id}/comments
pub async fn handle_comments(state: Arc<AppState>, issue_id: &str) -> Response<FullBody> {
    match state.pipeline.comments(issue_id).await {
        Ok(comments) => {
            let views: Vec<CommentView> = comments.iter().map(CommentView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("a,b , c"), vec!["a", "b", "c"]);
        assert_eq!(parse_tags(""), Vec::<String>::new());
        assert_eq!(parse_tags(" , ,"), Vec::<String>::new());
        assert_eq!(parse_tags("pothole"), vec!["pothole"]);
    }

    #[test]
    fn test_parse_coordinate_lenient() {
        assert_eq!(parse_coordinate(Some("12.5")), Some(12.5));
        assert_eq!(parse_coordinate(Some(" -3.25 ")), Some(-3.25));
        assert_eq!(parse_coordinate(Some("north")), None);
        assert_eq!(parse_coordinate(Some("")), None);
        assert_eq!(parse_coordinate(None), None);
    }

    #[test]
    fn test_coordinates_drop_lone_values() {
        assert_eq!(
            parse_coordinates(Some("12.5"), Some("-3.25")),
            (Some(12.5), Some(-3.25))
        );
        assert_eq!(parse_coordinates(Some("12.5"), None), (None, None));
        assert_eq!(parse_coordinates(None, Some("-3.25")), (None, None));
        assert_eq!(parse_coordinates(Some("12.5"), Some("east")), (None, None));
        assert_eq!(parse_coordinates(None, None), (None, None));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("x".into())), Some("x".to_string()));
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
