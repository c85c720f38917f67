//! News document schema
//!
//! Static announcements surfaced on the landing feed; the API returns the
//! latest three.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for news items
pub const NEWS_COLLECTION: &str = "news";

/// News document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewsDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    pub description: String,

    pub image_url: Option<String>,

    pub link: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl IntoIndexes for NewsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("created_at_desc".to_string())
                    .build(),
            ),
        )]
    }
}
