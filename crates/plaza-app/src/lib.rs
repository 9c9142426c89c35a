//! Application layer of the plaza social directory: auth session, profile
//! directory, likes, and the chat session. Everything here orchestrates the
//! backend capabilities ([`plaza_db::Store`], [`plaza_realtime::Channels`],
//! an [`auth::IdentityProvider`]) and keeps local session state; there is no
//! other surface.

pub mod auth;
pub mod chat;
pub mod config;
pub mod directory;
pub mod error;
pub mod profiles;
pub mod retry;

use std::sync::Arc;

use serde_json::Value;

use plaza_db::{Collection, SqliteStore, Store};
use plaza_realtime::Channels;
use plaza_types::record::Record;

pub use auth::{AuthClient, AuthState, IdentityProvider, StaticIdentity};
pub use chat::{ChatSession, SubscriptionState};
pub use config::Config;
pub use directory::{Directory, NewProfile, ProfileUpdate};
pub use error::AppError;
pub use profiles::{LikeSummary, Profiles};
pub use retry::RetryPolicy;

/// Shared application state: the store, the realtime channels, and the auth
/// session, wired once at startup.
pub struct App<S: Store, P: IdentityProvider> {
    store: Arc<S>,
    channels: Channels,
    auth: AuthClient<P>,
}

impl<P: IdentityProvider> App<SqliteStore, P> {
    /// Stand the app up on the reference SQLite store.
    pub fn open(config: &Config, provider: P) -> Result<Self, AppError> {
        let store = SqliteStore::open(&config.db_path)?;
        let channels = Channels::with_capacity(config.channel_capacity);
        Ok(Self::new(store, channels, provider))
    }
}

impl<S: Store, P: IdentityProvider> App<S, P> {
    pub fn new(store: S, channels: Channels, provider: P) -> Self {
        Self {
            store: Arc::new(store),
            channels,
            auth: AuthClient::new(provider),
        }
    }

    pub fn auth(&self) -> &AuthClient<P> {
        &self.auth
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn directory(&self) -> Directory<S> {
        Directory::new(Arc::clone(&self.store))
    }

    pub fn profiles(&self) -> Profiles<S> {
        Profiles::new(Arc::clone(&self.store))
    }

    /// Open a chat with `peer_username` as the signed-in user.
    pub async fn open_chat(&self, peer_username: &str) -> Result<ChatSession<S>, AppError> {
        let me = self.auth.current_user().ok_or(AppError::SignedOut)?;
        ChatSession::open(
            Arc::clone(&self.store),
            self.channels.clone(),
            me,
            peer_username,
        )
        .await
    }

    /// Release shared resources: realtime topics close and the auth session
    /// signs out.
    pub fn shutdown(&self) {
        self.channels.shutdown();
        self.auth.logout();
    }
}

/// Decode a record at the store-access boundary, tagging failures with the
/// collection they came from.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    collection: Collection,
    record: Record,
) -> Result<T, AppError> {
    plaza_types::record::decode(record).map_err(|source| AppError::BadRecord { collection, source })
}

pub(crate) fn decode_all<T: serde::de::DeserializeOwned>(
    collection: Collection,
    records: Vec<Record>,
) -> Result<Vec<T>, AppError> {
    records
        .into_iter()
        .map(|record| decode(collection, record))
        .collect()
}

/// Narrow a `json!` literal to the map the store APIs take.
pub(crate) fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
