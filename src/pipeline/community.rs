//! Community resolution
//!
//! Maps a free-text locality name to a stable community id, creating the
//! community on first sight. Find-or-create is best effort: no lock is
//! taken, the insert relies on the store's case-insensitive name uniqueness,
//! and a loser of a concurrent create re-reads the winner's row.

use tracing::info;

use crate::db::schemas::CommunityDoc;
use crate::db::store::RecordStore;
use crate::types::{CivicError, Result};

/// Resolve `name` to a community id, auto-creating one if absent.
pub async fn resolve_community(store: &dyn RecordStore, name: &str) -> Result<String> {
    if let Some(existing) = store.find_community_by_name(name).await? {
        return Ok(existing.id);
    }

    let candidate = CommunityDoc::new(name, &format!("Auto-created from {}", name));
    match store.insert_community(candidate).await {
        Ok(created) => {
            info!("Auto-created community '{}' ({})", created.name, created.id);
            Ok(created.id)
        }
        // Lost a concurrent create for the same name: use the winner's row.
        Err(CivicError::Conflict(_)) => store
            .find_community_by_name(name)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| {
                CivicError::Database(format!(
                    "Community '{}' conflicted on insert but is not readable",
                    name
                ))
            }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_auto_creates_on_miss() {
        let store = MemoryStore::new();
        let id = resolve_community(&store, "Springfield").await.unwrap();

        let community = store
            .find_community_by_name("Springfield")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(community.id, id);
        assert_eq!(community.name, "Springfield");
        assert_eq!(community.description, "Auto-created from Springfield");
    }

    #[tokio::test]
    async fn test_resolution_is_case_insensitive() {
        let store = MemoryStore::new();
        let first = resolve_community(&store, "Springfield").await.unwrap();
        let second = resolve_community(&store, "springfield").await.unwrap();
        let third = resolve_community(&store, "SPRINGFIELD").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(store.community_count().await, 1);
    }

    #[tokio::test]
    async fn test_conflict_falls_back_to_lookup() {
        let store = MemoryStore::new();
        // Simulate losing the race: the row appears between our miss and our
        // insert attempt.
        let winner = CommunityDoc::new("Shelbyville", "Auto-created from Shelbyville");
        let winner_id = winner.id.clone();
        store.insert_community(winner).await.unwrap();

        let resolved = resolve_community(&store, "shelbyville").await.unwrap();
        assert_eq!(resolved, winner_id);
    }
}
