//! Upvote document schema
//!
//! One row per (issue, reporter) pair, ever. The unique compound index is
//! the authority on upvote idempotence: the cached count on the issue is
//! incremented only when an insert into this collection wins.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for upvotes
pub const UPVOTE_COLLECTION: &str = "issue_upvotes";

/// Upvote document stored in MongoDB. Never mutated or deleted.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpvoteDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub issue_id: String,

    pub user_id: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UpvoteDoc {
    pub fn new(issue_id: &str, user_id: &str) -> Self {
        Self {
            id: None,
            issue_id: issue_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl IntoIndexes for UpvoteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "issue_id": 1, "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("issue_user_unique".to_string())
                    .build(),
            ),
        )]
    }
}
