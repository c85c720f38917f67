//! Community document schema
//!
//! The `name_key` field holds the lower-cased name and carries the unique
//! index, making name uniqueness case-insensitive at the store level.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::IntoIndexes;

/// Collection name for communities
pub const COMMUNITY_COLLECTION: &str = "communities";

/// Community document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommunityDoc {
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name as first reported
    pub name: String,

    /// Lower-cased resolution key, unique
    pub name_key: String,

    pub description: String,
}

impl CommunityDoc {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            name_key: name.to_lowercase(),
            description: description.to_string(),
        }
    }
}

impl IntoIndexes for CommunityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name_key": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_key_unique".to_string())
                    .build(),
            ),
        )]
    }
}
