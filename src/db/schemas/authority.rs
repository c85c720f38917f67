//! Authority user document schema
//!
//! Authority accounts are provisioned out of band; this service only reads
//! them at login. `unique_code` is the credential, paired with the name.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for authority users
pub const AUTHORITY_COLLECTION: &str = "authority_users";

/// Authority user document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthorityDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Login credential, globally unique
    pub unique_code: String,

    /// Write scope for the lifetime of any session token issued to this
    /// authority
    pub assigned_community_id: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl IntoIndexes for AuthorityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "unique_code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("unique_code_unique".to_string())
                        .build(),
                ),
            ),
            // Login lookup
            (
                doc! { "name": 1, "unique_code": 1 },
                Some(
                    IndexOptions::builder()
                        .name("name_code_lookup".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
