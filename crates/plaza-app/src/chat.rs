//! One chat session: the pairing of the signed-in user with one peer,
//! scoping their message history and a realtime topic. Opening a session
//! runs the strictly ordered sequence find peer -> resolve room -> load
//! history -> subscribe; each step consumes the previous result.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use plaza_db::{Collection, Query, Store};
use plaza_realtime::{Channels, RecvError, Subscriber, Subscription};
use plaza_types::events::ChannelEvent;
use plaza_types::models::{AuthUser, ChatRoom, Message, MessageType, User};

use crate::error::AppError;
use crate::profiles::Profiles;
use crate::retry::{RetryPolicy, with_retry};
use crate::{decode, decode_all, object};

/// History beyond this cap is invisible; there is no further pagination.
pub const MESSAGE_HISTORY_LIMIT: u32 = 100;

/// The realtime topic carrying a room's live messages.
pub fn room_topic(room_id: Uuid) -> String {
    format!("chat-{room_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

/// Find the room for an unordered user pair, creating it on first contact.
/// The pair is stored in the orientation it was first resolved in, so the
/// lookup checks both.
///
/// Check-then-create: two sessions resolving the same pair concurrently can
/// both miss and both insert. The store carries no uniqueness constraint on
/// the pair, so duplicates stay and later lookups take the first match.
pub async fn resolve_room<S: Store>(store: &S, a: Uuid, b: Uuid) -> Result<ChatRoom, AppError> {
    let mut rooms = store
        .list(
            Collection::ChatRooms,
            Query::new().filter("user1_id", a).filter("user2_id", b),
        )
        .await?;
    if rooms.is_empty() {
        rooms = store
            .list(
                Collection::ChatRooms,
                Query::new().filter("user1_id", b).filter("user2_id", a),
            )
            .await?;
    }
    if let Some(record) = rooms.into_iter().next() {
        return decode(Collection::ChatRooms, record);
    }

    debug!(user1 = %a, user2 = %b, "creating chat room on first contact");
    let record = store
        .create(
            Collection::ChatRooms,
            object(json!({ "user1_id": a, "user2_id": b })),
        )
        .await?;
    decode(Collection::ChatRooms, record)
}

async fn load_history<S: Store>(store: &S, room_id: Uuid) -> Result<Vec<Message>, AppError> {
    let query = Query::new()
        .filter("chat_room_id", room_id)
        .order_asc("created_at")
        .limit(MESSAGE_HISTORY_LIMIT);
    let records = with_retry(RetryPolicy::default(), || {
        store.list(Collection::Messages, query.clone())
    })
    .await?;
    decode_all(Collection::Messages, records)
}

pub struct ChatSession<S: Store> {
    inner: Arc<SessionInner<S>>,
    pump: Option<JoinHandle<()>>,
}

impl<S: Store> std::fmt::Debug for ChatSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession").finish_non_exhaustive()
    }
}

struct SessionInner<S> {
    store: Arc<S>,
    channels: Channels,
    me: AuthUser,
    peer: User,
    room: ChatRoom,
    topic: String,
    messages: RwLock<Vec<Message>>,
    sending: AtomicBool,
    sub_state: AtomicU8,
}

impl<S> SessionInner<S> {
    /// Merge one message into the local list, deduplicating by id. Both the
    /// sender's optimistic append and the realtime echo of the same message
    /// land here; the second arrival is ignored. Arrival order is append
    /// order, with no timestamp reordering.
    fn merge(&self, message: Message) -> bool {
        let mut messages = self.messages.write().expect("message list lock poisoned");
        if messages.iter().any(|existing| existing.id == message.id) {
            return false;
        }
        messages.push(message);
        true
    }

    fn set_state(&self, state: SubscriptionState) {
        self.sub_state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> SubscriptionState {
        match self.sub_state.load(Ordering::Acquire) {
            1 => SubscriptionState::Subscribing,
            2 => SubscriptionState::Subscribed,
            _ => SubscriptionState::Unsubscribed,
        }
    }
}

impl<S: Store> ChatSession<S> {
    /// Open a session with the user behind `peer_username`.
    ///
    /// History loading fails soft: a store error logs and the session
    /// starts empty. So does subscribing: the session then runs
    /// history-only and the peer still sees persisted messages on their
    /// next load.
    pub async fn open(
        store: Arc<S>,
        channels: Channels,
        me: AuthUser,
        peer_username: &str,
    ) -> Result<Self, AppError> {
        let peer = Profiles::new(Arc::clone(&store))
            .find_by_username(peer_username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(peer_username.to_string()))?;

        let room = resolve_room(store.as_ref(), me.id, peer.id).await?;

        let messages = match load_history(store.as_ref(), room.id).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(room = %room.id, error = %err, "loading message history failed");
                Vec::new()
            }
        };

        let topic = room_topic(room.id);
        let inner = Arc::new(SessionInner {
            store,
            channels,
            topic: topic.clone(),
            messages: RwLock::new(messages),
            sending: AtomicBool::new(false),
            sub_state: AtomicU8::new(SubscriptionState::Subscribing as u8),
            me,
            peer,
            room,
        });

        let subscriber = Subscriber {
            user_id: inner.me.id,
            display_name: inner.me.handle(),
        };
        let pump_task = match with_retry(RetryPolicy::default(), || {
            inner.channels.subscribe(&topic, subscriber.clone())
        })
        .await
        {
            Ok(subscription) => {
                inner.set_state(SubscriptionState::Subscribed);
                Some(tokio::spawn(pump(Arc::clone(&inner), subscription)))
            }
            Err(err) => {
                warn!(%topic, error = %err, "realtime subscribe failed, session is history-only");
                inner.set_state(SubscriptionState::Unsubscribed);
                None
            }
        };

        Ok(Self {
            inner,
            pump: pump_task,
        })
    }

    pub fn room(&self) -> &ChatRoom {
        &self.inner.room
    }

    pub fn peer(&self) -> &User {
        &self.inner.peer
    }

    /// Snapshot of the session's message list, in arrival order.
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .messages
            .read()
            .expect("message list lock poisoned")
            .clone()
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        self.inner.state()
    }

    /// Send a message: persist it, append it locally before any delivery
    /// confirmation, then nudge the peer over the realtime topic. A persist
    /// failure aborts the send; a publish failure after the persist only
    /// logs, since the message exists and the peer sees it on next load.
    pub async fn send(&self, text: &str) -> Result<Message, AppError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(AppError::EmptyMessage);
        }
        if self.inner.sending.swap(true, Ordering::AcqRel) {
            return Err(AppError::SendInFlight);
        }
        // Resets the guard even if the send future is cancelled mid-flight.
        let _guard = SendGuard(&self.inner.sending);
        self.deliver(content).await
    }

    async fn deliver(&self, content: &str) -> Result<Message, AppError> {
        let inner = &self.inner;
        let fields = object(json!({
            "chat_room_id": inner.room.id,
            "sender_id": inner.me.id,
            "content": content,
            "message_type": MessageType::Text,
        }));
        let record = inner.store.create(Collection::Messages, fields).await?;
        let message: Message = decode(Collection::Messages, record)?;

        inner.merge(message.clone());

        if let Err(err) = inner
            .channels
            .publish(&inner.topic, ChannelEvent::NewMessage(message.clone()))
            .await
        {
            warn!(topic = %inner.topic, error = %err, "realtime publish failed");
        }

        Ok(message)
    }

    /// Tear the session down: the merge task stops and the subscription is
    /// released, so events arriving afterward are discarded.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.inner.set_state(SubscriptionState::Unsubscribed);
    }
}

impl<S: Store> Drop for ChatSession<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct SendGuard<'a>(&'a AtomicBool);

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn pump<S: Store>(inner: Arc<SessionInner<S>>, mut subscription: Subscription) {
    loop {
        match subscription.recv().await {
            Ok(ChannelEvent::NewMessage(message)) => {
                inner.merge(message);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(topic = %inner.topic, skipped, "realtime subscription lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    inner.set_state(SubscriptionState::Unsubscribed);
}
