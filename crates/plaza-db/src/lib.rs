//! The data-store capability: generic list/create/update/delete over named
//! collections. Application code is generic over [`Store`]; [`SqliteStore`]
//! is the reference implementation and [`MemoryStore`] the mock.

pub mod error;
pub mod memory;
pub mod migrations;
pub mod query;
pub mod schema;
pub mod sqlite;

use std::future::Future;

use uuid::Uuid;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{Direction, Query};
pub use schema::Collection;
pub use sqlite::SqliteStore;

use plaza_types::record::Record;

/// Backend collection store. All calls are suspension points; nothing here
/// blocks the caller's thread.
pub trait Store: Send + Sync + 'static {
    /// Fetch records matching the query's equality filters, in the query's
    /// order, up to its limit.
    fn list(
        &self,
        collection: Collection,
        query: Query,
    ) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

    /// Insert a record. `id` is generated unless supplied in `fields`;
    /// `created_at`/`updated_at` are stamped unless supplied. Returns the
    /// canonical stored record.
    fn create(
        &self,
        collection: Collection,
        fields: Record,
    ) -> impl Future<Output = Result<Record, StoreError>> + Send;

    /// Patch an existing record and re-stamp `updated_at` where the
    /// collection carries one. Returns the updated record.
    fn update(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Record,
    ) -> impl Future<Output = Result<Record, StoreError>> + Send;

    /// Remove a record by id.
    fn delete(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
