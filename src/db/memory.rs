//! In-memory record store
//!
//! Used when MongoDB is unreachable in dev mode, and by the pipeline tests.
//! All state sits behind one mutex, so each store call is atomic by
//! construction - in particular the upvote check+insert+increment happens
//! under the lock, mirroring what the unique index guarantees on MongoDB.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::db::schemas::{
    AuthorityDoc, CommentDoc, CommunityDoc, IssueDoc, IssueStatus, NewsDoc,
};
use crate::db::store::RecordStore;
use crate::types::{CivicError, Result};

#[derive(Default)]
struct Inner {
    issues: HashMap<String, IssueDoc>,
    upvotes: HashSet<(String, String)>,
    comments: Vec<CommentDoc>,
    communities: Vec<CommunityDoc>,
    authorities: Vec<AuthorityDoc>,
    news: Vec<NewsDoc>,
}

/// Record store held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an authority account (provisioning is out of band in production).
    pub async fn seed_authority(&self, authority: AuthorityDoc) {
        self.inner.lock().await.authorities.push(authority);
    }

    /// Seed a news item.
    pub async fn seed_news(&self, item: NewsDoc) {
        self.inner.lock().await.news.push(item);
    }

    /// Number of stored issues. Test hook for atomicity assertions.
    pub async fn issue_count(&self) -> usize {
        self.inner.lock().await.issues.len()
    }

    /// Number of stored communities.
    pub async fn community_count(&self) -> usize {
        self.inner.lock().await.communities.len()
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle))
        .unwrap_or(false)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_issue(&self, issue: IssueDoc) -> Result<IssueDoc> {
        let mut inner = self.inner.lock().await;
        inner.issues.insert(issue.id.clone(), issue.clone());
        Ok(issue)
    }

    async fn find_issue(&self, id: &str) -> Result<Option<IssueDoc>> {
        Ok(self.inner.lock().await.issues.get(id).cloned())
    }

    async fn search_issues(&self, term: Option<&str>) -> Result<Vec<IssueDoc>> {
        let inner = self.inner.lock().await;
        let mut issues: Vec<IssueDoc> = match term {
            Some(term) if !term.trim().is_empty() => {
                let needle = term.to_lowercase();
                inner
                    .issues
                    .values()
                    .filter(|i| {
                        contains_ci(Some(&i.description), &needle)
                            || contains_ci(i.city.as_deref(), &needle)
                            || contains_ci(i.road.as_deref(), &needle)
                            || contains_ci(i.country.as_deref(), &needle)
                    })
                    .cloned()
                    .collect()
            }
            _ => inner.issues.values().cloned().collect(),
        };
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(issues)
    }

    async fn issues_by_community(&self, community_id: &str) -> Result<Vec<IssueDoc>> {
        let inner = self.inner.lock().await;
        let mut issues: Vec<IssueDoc> = inner
            .issues
            .values()
            .filter(|i| i.community_id.as_deref() == Some(community_id))
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(issues)
    }

    async fn set_issue_status(&self, id: &str, status: IssueStatus) -> Result<Option<IssueDoc>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.issues.get_mut(id).map(|issue| {
            issue.status = status;
            issue.delivery_confirmed = status.delivery_confirmed();
            issue.clone()
        }))
    }

    async fn record_upvote(&self, issue_id: &str, user_id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let key = (issue_id.to_string(), user_id.to_string());
        if !inner.upvotes.insert(key) {
            return Ok(false);
        }
        if let Some(issue) = inner.issues.get_mut(issue_id) {
            issue.upvote_count += 1;
        }
        Ok(true)
    }

    async fn insert_comment(&self, comment: CommentDoc) -> Result<CommentDoc> {
        self.inner.lock().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments_for_issue(&self, issue_id: &str) -> Result<Vec<CommentDoc>> {
        let inner = self.inner.lock().await;
        let mut comments: Vec<CommentDoc> = inner
            .comments
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn find_community_by_name(&self, name: &str) -> Result<Option<CommunityDoc>> {
        let key = name.to_lowercase();
        Ok(self
            .inner
            .lock()
            .await
            .communities
            .iter()
            .find(|c| c.name_key == key)
            .cloned())
    }

    async fn insert_community(&self, community: CommunityDoc) -> Result<CommunityDoc> {
        let mut inner = self.inner.lock().await;
        if inner.communities.iter().any(|c| c.name_key == community.name_key) {
            return Err(CivicError::Conflict(format!(
                "Community '{}' already exists",
                community.name
            )));
        }
        inner.communities.push(community.clone());
        Ok(community)
    }

    async fn find_authority(&self, name: &str, unique_code: &str) -> Result<Option<AuthorityDoc>> {
        Ok(self
            .inner
            .lock()
            .await
            .authorities
            .iter()
            .find(|a| a.name == name && a.unique_code == unique_code)
            .cloned())
    }

    async fn latest_news(&self, limit: usize) -> Result<Vec<NewsDoc>> {
        let inner = self.inner.lock().await;
        let mut news = inner.news.clone();
        news.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        news.truncate(limit);
        Ok(news)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn authority(name: &str, code: &str) -> AuthorityDoc {
        AuthorityDoc {
            id: format!("auth-{}", name),
            name: name.to_string(),
            unique_code: code.to_string(),
            assigned_community_id: "community-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_authority_lookup_requires_both_credentials() {
        let store = MemoryStore::new();
        store.seed_authority(authority("Ward Office", "WARD-1")).await;

        assert!(store
            .find_authority("Ward Office", "WARD-1")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_authority("Ward Office", "WARD-2")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_authority("Other Office", "WARD-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_latest_news_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            store
                .seed_news(NewsDoc {
                    id: format!("n-{}", i),
                    title: format!("Item {}", i),
                    description: String::new(),
                    image_url: None,
                    link: None,
                    created_at: base + Duration::seconds(i),
                })
                .await;
        }

        let latest = store.latest_news(3).await.unwrap();
        let ids: Vec<&str> = latest.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n-4", "n-3", "n-2"]);
    }
}
