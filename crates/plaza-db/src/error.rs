use uuid::Uuid;

use crate::schema::Collection;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no {collection} record with id {id}")]
    NotFound { collection: Collection, id: Uuid },

    #[error("unknown field `{field}` on {collection}")]
    UnknownField { collection: Collection, field: String },

    #[error("field `{field}` on {collection} rejected: {reason}")]
    InvalidValue {
        collection: Collection,
        field: String,
        reason: String,
    },

    #[error("required field `{field}` missing on {collection}")]
    MissingField { collection: Collection, field: String },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store worker aborted: {0}")]
    Background(#[from] tokio::task::JoinError),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether a retry has any chance of succeeding. Schema and lookup
    /// failures are deterministic; backend/worker failures may not be.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Sqlite(_) | StoreError::Background(_))
    }
}
