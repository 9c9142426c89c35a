use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use plaza_db::{Collection, Query, Store};
use plaza_types::models::{ProfileLike, User};

use crate::error::AppError;
use crate::{decode, object};

/// Like state for one profile as seen by one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSummary {
    pub count: usize,
    pub liked_by_viewer: bool,
}

pub struct Profiles<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Profiles<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Look a profile up by username. `None` is the typed not-found
    /// outcome; callers render a static not-found view instead of erroring.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let records = self
            .store
            .list(Collection::Users, Query::new().filter("username", username))
            .await?;
        match records.into_iter().next() {
            Some(record) => Ok(Some(decode(Collection::Users, record)?)),
            None => Ok(None),
        }
    }

    /// Total likes on a profile plus whether `viewer` is among them.
    pub async fn like_summary(
        &self,
        profile_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<LikeSummary, AppError> {
        let all = self
            .store
            .list(
                Collection::ProfileLikes,
                Query::new().filter("liked_user_id", profile_id),
            )
            .await?;

        let liked_by_viewer = match viewer {
            Some(viewer) => !self.viewer_edges(viewer, profile_id).await?.is_empty(),
            None => false,
        };

        Ok(LikeSummary {
            count: all.len(),
            liked_by_viewer,
        })
    }

    /// Flip the viewer's like on a profile and return the new state.
    ///
    /// Check-then-act: two racing toggles can insert duplicate edges, since
    /// the store carries no uniqueness constraint on the pair. Unlike
    /// removes only the first matching edge.
    pub async fn toggle_like(
        &self,
        viewer: Uuid,
        profile_id: Uuid,
    ) -> Result<LikeSummary, AppError> {
        let existing = self.viewer_edges(viewer, profile_id).await?;
        match existing.into_iter().next() {
            Some(record) => {
                let like: ProfileLike = decode(Collection::ProfileLikes, record)?;
                self.store.delete(Collection::ProfileLikes, like.id).await?;
            }
            None => {
                let fields = object(json!({
                    "user_id": viewer,
                    "liked_user_id": profile_id,
                }));
                self.store
                    .create(Collection::ProfileLikes, fields)
                    .await?;
            }
        }
        self.like_summary(profile_id, Some(viewer)).await
    }

    async fn viewer_edges(
        &self,
        viewer: Uuid,
        profile_id: Uuid,
    ) -> Result<Vec<plaza_types::record::Record>, AppError> {
        Ok(self
            .store
            .list(
                Collection::ProfileLikes,
                Query::new()
                    .filter("user_id", viewer)
                    .filter("liked_user_id", profile_id),
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use plaza_db::MemoryStore;

    use super::*;

    async fn seed_user(store: &Arc<MemoryStore>, username: &str) -> User {
        let record = store
            .create(
                Collection::Users,
                object(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "full_name": username,
                })),
            )
            .await
            .unwrap();
        decode(Collection::Users, record).unwrap()
    }

    #[tokio::test]
    async fn lookup_by_username_distinguishes_missing() {
        let store = Arc::new(MemoryStore::new());
        let profiles = Profiles::new(store.clone());
        seed_user(&store, "alice").await;

        assert!(profiles.find_by_username("alice").await.unwrap().is_some());
        assert!(profiles.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn like_then_unlike_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let profiles = Profiles::new(store.clone());
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        let before = profiles.like_summary(bob.id, Some(alice.id)).await.unwrap();
        assert_eq!(
            before,
            LikeSummary {
                count: 0,
                liked_by_viewer: false
            }
        );

        let liked = profiles.toggle_like(alice.id, bob.id).await.unwrap();
        assert_eq!(
            liked,
            LikeSummary {
                count: 1,
                liked_by_viewer: true
            }
        );

        let unliked = profiles.toggle_like(alice.id, bob.id).await.unwrap();
        assert_eq!(
            unliked,
            LikeSummary {
                count: 0,
                liked_by_viewer: false
            }
        );
    }

    #[tokio::test]
    async fn likes_from_others_do_not_mark_the_viewer() {
        let store = Arc::new(MemoryStore::new());
        let profiles = Profiles::new(store.clone());
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let carol = seed_user(&store, "carol").await;

        profiles.toggle_like(carol.id, bob.id).await.unwrap();

        let summary = profiles.like_summary(bob.id, Some(alice.id)).await.unwrap();
        assert_eq!(
            summary,
            LikeSummary {
                count: 1,
                liked_by_viewer: false
            }
        );
    }

    #[tokio::test]
    async fn unlike_removes_a_single_edge_when_duplicates_raced_in() {
        let store = Arc::new(MemoryStore::new());
        let profiles = Profiles::new(store.clone());
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        // Two edges for the same pair, as racing likes would leave behind.
        for _ in 0..2 {
            store
                .create(
                    Collection::ProfileLikes,
                    object(json!({ "user_id": alice.id, "liked_user_id": bob.id })),
                )
                .await
                .unwrap();
        }

        let after = profiles.toggle_like(alice.id, bob.id).await.unwrap();
        assert_eq!(
            after,
            LikeSummary {
                count: 1,
                liked_by_viewer: true
            }
        );
    }
}
