use uuid::Uuid;

use plaza_db::{Collection, StoreError};
use plaza_realtime::ChannelError;
use plaza_types::record::RecordError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("user `{0}` not found")]
    UserNotFound(String),

    #[error("a profile already exists for {0}")]
    ProfileExists(Uuid),

    #[error("not signed in")]
    SignedOut,

    #[error("message text is empty")]
    EmptyMessage,

    #[error("a send is already in flight")]
    SendInFlight,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("malformed {collection} record: {source}")]
    BadRecord {
        collection: Collection,
        source: RecordError,
    },
}

impl AppError {
    /// Whether retrying the same operation could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Store(err) => err.is_transient(),
            AppError::Channel(err) => err.is_transient(),
            _ => false,
        }
    }
}
