//! Comment document schema
//!
//! Append-only; read back ordered by creation time ascending.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for issue comments
pub const COMMENT_COLLECTION: &str = "issue_comments";

/// Comment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub issue_id: String,

    pub user_id: String,

    pub comment_text: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl CommentDoc {
    pub fn new(issue_id: &str, user_id: &str, comment_text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            issue_id: issue_id.to_string(),
            user_id: user_id.to_string(),
            comment_text: comment_text.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "issue_id": 1, "created_at": 1 },
            Some(
                IndexOptions::builder()
                    .name("issue_created_at".to_string())
                    .build(),
            ),
        )]
    }
}
