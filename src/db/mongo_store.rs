//! MongoDB implementation of the record store

use async_trait::async_trait;
use bson::doc;
use futures_util::StreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::Collection;
use tracing::error;

use crate::db::mongo::MongoClient;
use crate::db::schemas::{
    AuthorityDoc, CommentDoc, CommunityDoc, IssueDoc, IssueStatus, NewsDoc, AUTHORITY_COLLECTION,
    COMMENT_COLLECTION, COMMUNITY_COLLECTION, ISSUE_COLLECTION, NEWS_COLLECTION, UPVOTE_COLLECTION,
};
use crate::db::schemas::UpvoteDoc;
use crate::db::store::RecordStore;
use crate::types::{CivicError, Result};

/// Duplicate-key write error (unique index violation)
const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

/// Escape a user-supplied search term for use inside a `$regex` filter.
fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if !c.is_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Record store backed by MongoDB collections with schema-defined indexes.
#[derive(Clone)]
pub struct MongoStore {
    issues: Collection<IssueDoc>,
    upvotes: Collection<UpvoteDoc>,
    comments: Collection<CommentDoc>,
    communities: Collection<CommunityDoc>,
    authorities: Collection<AuthorityDoc>,
    news: Collection<NewsDoc>,
}

impl MongoStore {
    /// Open all collections and apply their indexes.
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            issues: client.collection(ISSUE_COLLECTION).await?,
            upvotes: client.collection(UPVOTE_COLLECTION).await?,
            comments: client.collection(COMMENT_COLLECTION).await?,
            communities: client.collection(COMMUNITY_COLLECTION).await?,
            authorities: client.collection(AUTHORITY_COLLECTION).await?,
            news: client.collection(NEWS_COLLECTION).await?,
        })
    }
}

async fn collect_cursor<T>(cursor: mongodb::Cursor<T>) -> Vec<T>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    cursor
        .filter_map(|item| async {
            match item {
                Ok(doc) => Some(doc),
                Err(e) => {
                    error!("Error reading document: {}", e);
                    None
                }
            }
        })
        .collect()
        .await
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn insert_issue(&self, issue: IssueDoc) -> Result<IssueDoc> {
        self.issues.insert_one(&issue).await?;
        Ok(issue)
    }

    async fn find_issue(&self, id: &str) -> Result<Option<IssueDoc>> {
        Ok(self.issues.find_one(doc! { "_id": id }).await?)
    }

    async fn search_issues(&self, term: Option<&str>) -> Result<Vec<IssueDoc>> {
        let filter = match term {
            Some(term) if !term.trim().is_empty() => {
                let pattern = escape_regex(term);
                let field = |name: &str| doc! { name: { "$regex": &pattern, "$options": "i" } };
                doc! { "$or": [
                    field("description"),
                    field("city"),
                    field("road"),
                    field("country"),
                ] }
            }
            _ => doc! {},
        };

        let cursor = self
            .issues
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(collect_cursor(cursor).await)
    }

    async fn issues_by_community(&self, community_id: &str) -> Result<Vec<IssueDoc>> {
        let cursor = self
            .issues
            .find(doc! { "community_id": community_id })
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(collect_cursor(cursor).await)
    }

    async fn set_issue_status(&self, id: &str, status: IssueStatus) -> Result<Option<IssueDoc>> {
        let update = doc! { "$set": {
            "status": status.as_str(),
            "delivery_confirmed": status.delivery_confirmed(),
        } };

        Ok(self
            .issues
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn record_upvote(&self, issue_id: &str, user_id: &str) -> Result<bool> {
        // The unique (issue_id, user_id) index arbitrates concurrent upvotes:
        // exactly one insert wins, and only that writer increments the count.
        match self.upvotes.insert_one(UpvoteDoc::new(issue_id, user_id)).await {
            Ok(_) => {
                self.issues
                    .update_one(
                        doc! { "_id": issue_id },
                        doc! { "$inc": { "upvote_count": 1 } },
                    )
                    .await?;
                Ok(true)
            }
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_comment(&self, comment: CommentDoc) -> Result<CommentDoc> {
        self.comments.insert_one(&comment).await?;
        Ok(comment)
    }

    async fn comments_for_issue(&self, issue_id: &str) -> Result<Vec<CommentDoc>> {
        let cursor = self
            .comments
            .find(doc! { "issue_id": issue_id })
            .sort(doc! { "created_at": 1 })
            .await?;
        Ok(collect_cursor(cursor).await)
    }

    async fn find_community_by_name(&self, name: &str) -> Result<Option<CommunityDoc>> {
        Ok(self
            .communities
            .find_one(doc! { "name_key": name.to_lowercase() })
            .await?)
    }

    async fn insert_community(&self, community: CommunityDoc) -> Result<CommunityDoc> {
        match self.communities.insert_one(&community).await {
            Ok(_) => Ok(community),
            Err(e) if is_duplicate_key(&e) => Err(CivicError::Conflict(format!(
                "Community '{}' already exists",
                community.name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_authority(&self, name: &str, unique_code: &str) -> Result<Option<AuthorityDoc>> {
        Ok(self
            .authorities
            .find_one(doc! { "name": name, "unique_code": unique_code })
            .await?)
    }

    async fn latest_news(&self, limit: usize) -> Result<Vec<NewsDoc>> {
        let cursor = self
            .news
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit as i64)
            .await?;
        Ok(collect_cursor(cursor).await)
    }
}
