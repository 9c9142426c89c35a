use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use plaza_types::record::Record;

use crate::error::StoreError;
use crate::query::{Direction, Query};
use crate::schema::{self, Collection};
use crate::Store;

/// In-memory store for tests and demos. Enforces the collection schemas but
/// not the relational constraints (foreign keys, unique usernames) that the
/// reference SQLite store carries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<Collection, Vec<Record>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collection<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Vec<Record>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        f(collections.entry(collection).or_default())
    }
}

impl Store for MemoryStore {
    async fn list(&self, collection: Collection, query: Query) -> Result<Vec<Record>, StoreError> {
        self.with_collection(collection, |records| {
            for (field, _) in &query.filters {
                schema::check_field(collection, field)?;
            }

            let mut matches: Vec<Record> = records
                .iter()
                .filter(|record| {
                    query.filters.iter().all(|(field, value)| {
                        record.get(field).is_some_and(|stored| stored == value)
                    })
                })
                .cloned()
                .collect();

            if let Some((field, direction)) = &query.order {
                schema::check_field(collection, field)?;
                matches.sort_by(|a, b| {
                    let ordering = compare_values(
                        a.get(field).unwrap_or(&Value::Null),
                        b.get(field).unwrap_or(&Value::Null),
                    );
                    match direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    }
                });
            }

            if let Some(limit) = query.limit {
                matches.truncate(limit as usize);
            }

            Ok(matches)
        })
    }

    async fn create(&self, collection: Collection, fields: Record) -> Result<Record, StoreError> {
        let record = schema::new_record(collection, fields)?;
        self.with_collection(collection, |records| {
            records.push(record.clone());
            Ok(record)
        })
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Record,
    ) -> Result<Record, StoreError> {
        schema::check_patch(collection, &fields)?;
        let id_value = Value::String(id.to_string());
        self.with_collection(collection, |records| {
            let record = records
                .iter_mut()
                .find(|record| record.get("id") == Some(&id_value))
                .ok_or(StoreError::NotFound { collection, id })?;
            for (key, value) in fields {
                record.insert(key, value);
            }
            if collection.has_updated_at() {
                record.insert(
                    "updated_at".to_string(),
                    Value::String(schema::timestamp_now()),
                );
            }
            Ok(record.clone())
        })
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let id_value = Value::String(id.to_string());
        self.with_collection(collection, |records| {
            let before = records.len();
            records.retain(|record| record.get("id") != Some(&id_value));
            if records.len() == before {
                return Err(StoreError::NotFound { collection, id });
            }
            Ok(())
        })
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    async fn seed_like(store: &MemoryStore, liker: Uuid, liked: Uuid) -> Record {
        store
            .create(
                Collection::ProfileLikes,
                fields(json!({ "user_id": liker, "liked_user_id": liked })),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn filters_match_on_equality() {
        let store = MemoryStore::new();
        let liked = Uuid::new_v4();
        seed_like(&store, Uuid::new_v4(), liked).await;
        seed_like(&store, Uuid::new_v4(), Uuid::new_v4()).await;

        let matches = store
            .list(
                Collection::ProfileLikes,
                Query::new().filter("liked_user_id", liked),
            )
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn order_and_limit_apply_after_filtering() {
        let store = MemoryStore::new();
        for (name, stamp) in [
            ("bob", "2026-08-02T10:00:00Z"),
            ("alice", "2026-08-03T10:00:00Z"),
            ("carol", "2026-08-01T10:00:00Z"),
        ] {
            store
                .create(
                    Collection::Users,
                    fields(json!({
                        "username": name,
                        "email": format!("{name}@example.com"),
                        "full_name": name,
                        "created_at": stamp,
                    })),
                )
                .await
                .unwrap();
        }

        let newest_first = store
            .list(
                Collection::Users,
                Query::new().order_desc("created_at").limit(2),
            )
            .await
            .unwrap();
        assert_eq!(newest_first[0]["username"], "alice");
        assert_eq!(newest_first[1]["username"], "bob");
    }

    #[tokio::test]
    async fn unknown_filter_field_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .list(Collection::Users, Query::new().filter("nickname", "al"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { .. }));
    }

    #[tokio::test]
    async fn update_and_delete_miss_report_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store
                .update(Collection::Users, id, fields(json!({ "bio": "hi" })))
                .await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(Collection::Users, id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_restamps_updated_at() {
        let store = MemoryStore::new();
        let record = store
            .create(
                Collection::Users,
                fields(json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "full_name": "Alice",
                })),
            )
            .await
            .unwrap();
        let id: Uuid = record["id"].as_str().unwrap().parse().unwrap();

        let updated = store
            .update(Collection::Users, id, fields(json!({ "bio": "hello" })))
            .await
            .unwrap();
        assert_eq!(updated["bio"], "hello");
        assert!(updated["updated_at"].as_str() >= updated["created_at"].as_str());
    }
}
