//! Issue document schema
//!
//! The central record: a reported photo plus location metadata, attributed
//! to a reporter and optionally to a community. Issues are never deleted.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::IntoIndexes;

/// Collection name for issues
pub const ISSUE_COLLECTION: &str = "issues";

/// Lifecycle status of an issue.
///
/// `pending -> in-progress -> resolved` is the expected path, but no
/// transition table is enforced: an authority may set any value at any time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IssueStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
}

impl IssueStatus {
    /// Delivery confirmation is derived: true iff the status is resolved.
    pub fn delivery_confirmed(self) -> bool {
        self == IssueStatus::Resolved
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IssueStatus::Pending),
            "in-progress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            _ => Err(()),
        }
    }
}

/// Issue document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IssueDoc {
    /// Opaque unique id (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    /// Public URL of the annotated image
    pub image_url: String,

    /// Free-text description from the reporter
    pub description: String,

    /// Coordinates: both present or both absent
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Location labels, each optional
    pub road: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,

    /// Reporter identity, owned by the external identity system
    pub user_id: String,

    /// Community scope resolved at creation time, if any
    pub community_id: Option<String>,

    pub status: IssueStatus,

    /// Derived from status on update; forced true at creation
    pub delivery_confirmed: bool,

    /// Ordered tag sequence, may be empty
    pub tags: Vec<String>,

    /// Cached aggregate; incremented only by the writer that inserted the
    /// corresponding upvote row
    pub upvote_count: i64,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl IntoIndexes for IssueDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Feed ordering
            (
                doc! { "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_desc".to_string())
                        .build(),
                ),
            ),
            // Community-scoped listing
            (
                doc! { "community_id": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("community_created_at".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
