//! JSON view types shared by the issue and authority routes
//!
//! Wire field names are camelCase; the mobile clients depend on them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::schemas::{CommentDoc, IssueDoc, NewsDoc};
use crate::pipeline::IssueRecord;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub user_id: String,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CommentDoc> for CommentView {
    fn from(doc: &CommentDoc) -> Self {
        Self {
            id: doc.id.clone(),
            user_id: doc.user_id.clone(),
            comment_text: doc.comment_text.clone(),
            created_at: doc.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterView {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub id: String,
    pub image_url: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub road: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub community_id: Option<String>,
    pub status: String,
    pub delivery_confirmed: bool,
    pub tags: Vec<String>,
    pub upvote_count: i64,
    pub reporter: ReporterView,
    pub comments: Vec<CommentView>,
}

impl IssueView {
    pub fn from_issue(issue: &IssueDoc, comments: &[CommentDoc]) -> Self {
        Self {
            id: issue.id.clone(),
            image_url: issue.image_url.clone(),
            description: issue.description.clone(),
            latitude: issue.latitude,
            longitude: issue.longitude,
            road: issue.road.clone(),
            city: issue.city.clone(),
            country: issue.country.clone(),
            created_at: issue.created_at,
            user_id: issue.user_id.clone(),
            community_id: issue.community_id.clone(),
            status: issue.status.to_string(),
            delivery_confirmed: issue.delivery_confirmed,
            tags: issue.tags.clone(),
            upvote_count: issue.upvote_count,
            // Reporter identity lives with the external provider; only the id
            // is known here.
            reporter: ReporterView {
                user_id: issue.user_id.clone(),
                name: None,
            },
            comments: comments.iter().map(CommentView::from).collect(),
        }
    }
}

impl From<&IssueRecord> for IssueView {
    fn from(record: &IssueRecord) -> Self {
        Self::from_issue(&record.issue, &record.comments)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&NewsDoc> for NewsView {
    fn from(doc: &NewsDoc) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            image_url: doc.image_url.clone(),
            link: doc.link.clone(),
            created_at: doc.created_at,
        }
    }
}

/// Token response for citizen register/login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthView {
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}
