//! Record store contract
//!
//! The pipeline talks to the store through this trait so the same semantics
//! run against MongoDB in production and the in-memory store in dev mode and
//! tests. Every method is a single logical unit against the store: it either
//! fully applies or fails without partial effect.

use async_trait::async_trait;

use crate::db::schemas::{
    AuthorityDoc, CommentDoc, CommunityDoc, IssueDoc, IssueStatus, NewsDoc,
};
use crate::types::Result;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_issue(&self, issue: IssueDoc) -> Result<IssueDoc>;

    async fn find_issue(&self, id: &str) -> Result<Option<IssueDoc>>;

    /// All issues, newest first; when `term` is given, filtered to issues
    /// whose description, city, road or country case-insensitively contains
    /// it.
    async fn search_issues(&self, term: Option<&str>) -> Result<Vec<IssueDoc>>;

    /// Issues for one community, newest first.
    async fn issues_by_community(&self, community_id: &str) -> Result<Vec<IssueDoc>>;

    /// Set the status and derived delivery flag, returning the updated issue
    /// (`None` when the issue does not exist).
    async fn set_issue_status(&self, id: &str, status: IssueStatus) -> Result<Option<IssueDoc>>;

    /// Record an upvote for (issue, user). Returns `true` when this call
    /// inserted the row, in which case the cached count has been incremented
    /// by exactly one; `false` when the pair already existed (no-op). The
    /// check-then-increment race is resolved at the store level: only the
    /// writer whose insert wins performs the increment.
    async fn record_upvote(&self, issue_id: &str, user_id: &str) -> Result<bool>;

    async fn insert_comment(&self, comment: CommentDoc) -> Result<CommentDoc>;

    /// Comments for an issue, oldest first.
    async fn comments_for_issue(&self, issue_id: &str) -> Result<Vec<CommentDoc>>;

    /// Case-insensitive lookup by community name.
    async fn find_community_by_name(&self, name: &str) -> Result<Option<CommunityDoc>>;

    /// Insert a community; fails with `Conflict` when the name (compared
    /// case-insensitively) is already taken.
    async fn insert_community(&self, community: CommunityDoc) -> Result<CommunityDoc>;

    /// Authority login lookup by (name, unique code).
    async fn find_authority(&self, name: &str, unique_code: &str) -> Result<Option<AuthorityDoc>>;

    /// Latest news items, newest first.
    async fn latest_news(&self, limit: usize) -> Result<Vec<NewsDoc>>;
}
