use std::sync::Arc;

use serde_json::{Value, json};

use plaza_db::{Collection, Query, Store};
use plaza_types::models::{AuthUser, User};
use plaza_types::record::Record;

use crate::error::AppError;
use crate::retry::{RetryPolicy, with_retry};
use crate::{decode, decode_all, object};

/// How many profiles one directory page shows.
pub const DIRECTORY_PAGE_LIMIT: u32 = 50;

/// Profile fields supplied at creation. Anything left unset falls back to
/// the auth identity (username/full name from the handle, email from the
/// account).
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A patch to the caller's own profile; unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub struct Directory<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Directory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The newest profiles, one page worth.
    pub async fn load(&self) -> Result<Vec<User>, AppError> {
        let query = Query::new()
            .order_desc("created_at")
            .limit(DIRECTORY_PAGE_LIMIT);
        let records = with_retry(RetryPolicy::default(), || {
            self.store.list(Collection::Users, query.clone())
        })
        .await?;
        decode_all(Collection::Users, records)
    }

    /// Case-insensitive substring filter across name, username, location and
    /// bio. A blank query keeps everything.
    pub fn search<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return users.iter().collect();
        }
        users
            .iter()
            .filter(|user| {
                user.full_name.to_lowercase().contains(&needle)
                    || user.username.to_lowercase().contains(&needle)
                    || user
                        .location
                        .as_deref()
                        .is_some_and(|location| location.to_lowercase().contains(&needle))
                    || user
                        .bio
                        .as_deref()
                        .is_some_and(|bio| bio.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Create the signed-in identity's directory profile. Check-then-create:
    /// a concurrent creation for the same identity can slip between the
    /// lookup and the insert.
    pub async fn create_profile(
        &self,
        identity: &AuthUser,
        profile: NewProfile,
    ) -> Result<User, AppError> {
        let existing = self
            .store
            .list(Collection::Users, Query::new().filter("id", identity.id))
            .await?;
        if !existing.is_empty() {
            return Err(AppError::ProfileExists(identity.id));
        }

        let handle = identity.handle();
        let mut fields = object(json!({
            "id": identity.id,
            "username": profile.username.unwrap_or_else(|| handle.clone()),
            "email": identity.email,
            "full_name": profile.full_name.unwrap_or(handle),
        }));
        for (key, value) in [
            ("bio", profile.bio.map(Value::from)),
            ("location", profile.location.map(Value::from)),
            ("latitude", profile.latitude.map(Value::from)),
            ("longitude", profile.longitude.map(Value::from)),
        ] {
            if let Some(value) = value {
                fields.insert(key.to_string(), value);
            }
        }

        let record = self.store.create(Collection::Users, fields).await?;
        decode(Collection::Users, record)
    }

    /// Patch the signed-in identity's own profile. Profiles are only ever
    /// mutated by their owner.
    pub async fn update_profile(
        &self,
        identity: &AuthUser,
        patch: ProfileUpdate,
    ) -> Result<User, AppError> {
        let mut fields = Record::new();
        for (key, value) in [
            ("full_name", patch.full_name.map(Value::from)),
            ("bio", patch.bio.map(Value::from)),
            ("location", patch.location.map(Value::from)),
            ("latitude", patch.latitude.map(Value::from)),
            ("longitude", patch.longitude.map(Value::from)),
        ] {
            if let Some(value) = value {
                fields.insert(key.to_string(), value);
            }
        }

        let record = self
            .store
            .update(Collection::Users, identity.id, fields)
            .await?;
        decode(Collection::Users, record)
    }
}

#[cfg(test)]
mod tests {
    use plaza_db::MemoryStore;

    use super::*;

    async fn seed(store: &Arc<MemoryStore>, username: &str, bio: Option<&str>, stamp: &str) {
        let mut fields = object(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "full_name": username,
            "created_at": stamp,
        }));
        if let Some(bio) = bio {
            fields.insert("bio".into(), bio.into());
        }
        store.create(Collection::Users, fields).await.unwrap();
    }

    #[tokio::test]
    async fn load_returns_newest_first() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "alice", None, "2026-08-01T10:00:00Z").await;
        seed(&store, "bob", None, "2026-08-03T10:00:00Z").await;
        seed(&store, "carol", None, "2026-08-02T10:00:00Z").await;

        let users = Directory::new(store).load().await.unwrap();
        let names: Vec<_> = users.iter().map(|user| user.username.as_str()).collect();
        assert_eq!(names, ["bob", "carol", "alice"]);
    }

    #[tokio::test]
    async fn search_matches_bio_case_insensitively() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            "alice",
            Some("Amateur astronomer and Coffee enthusiast"),
            "2026-08-01T10:00:00Z",
        )
        .await;
        seed(&store, "bob", None, "2026-08-02T10:00:00Z").await;

        let users = Directory::new(store).load().await.unwrap();
        let hits = Directory::<MemoryStore>::search(&users, "COFFEE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "alice");
    }

    #[tokio::test]
    async fn blank_search_keeps_everything() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "alice", None, "2026-08-01T10:00:00Z").await;
        seed(&store, "bob", None, "2026-08-02T10:00:00Z").await;

        let users = Directory::new(store).load().await.unwrap();
        assert_eq!(Directory::<MemoryStore>::search(&users, "  ").len(), 2);
    }

    #[tokio::test]
    async fn create_profile_fills_identity_defaults() {
        let store = Arc::new(MemoryStore::new());
        let directory = Directory::new(store);
        let identity = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "alice@example.com".into(),
            display_name: None,
        };

        let user = directory
            .create_profile(
                &identity,
                NewProfile {
                    bio: Some("new in town".into()),
                    location: Some("San Francisco, CA".into()),
                    latitude: Some(37.7749),
                    longitude: Some(-122.4194),
                    ..NewProfile::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(user.id, identity.id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.full_name, "alice");
        assert_eq!(user.latitude, Some(37.7749));
    }

    #[tokio::test]
    async fn update_profile_patches_the_owners_record() {
        let store = Arc::new(MemoryStore::new());
        let directory = Directory::new(store);
        let identity = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "alice@example.com".into(),
            display_name: None,
        };

        directory
            .create_profile(&identity, NewProfile::default())
            .await
            .unwrap();
        let updated = directory
            .update_profile(
                &identity,
                ProfileUpdate {
                    bio: Some("moved downtown".into()),
                    latitude: Some(37.7858),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.bio.as_deref(), Some("moved downtown"));
        assert_eq!(updated.latitude, Some(37.7858));
        assert_eq!(updated.username, "alice");
    }

    #[tokio::test]
    async fn update_profile_without_a_profile_is_a_store_miss() {
        let store = Arc::new(MemoryStore::new());
        let directory = Directory::new(store);
        let identity = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "ghost@example.com".into(),
            display_name: None,
        };

        let err = directory
            .update_profile(&identity, ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(plaza_db::StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_profile_twice_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let directory = Directory::new(store);
        let identity = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "alice@example.com".into(),
            display_name: None,
        };

        directory
            .create_profile(&identity, NewProfile::default())
            .await
            .unwrap();
        let err = directory
            .create_profile(&identity, NewProfile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProfileExists(id) if id == identity.id));
    }
}
