use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use plaza_types::events::ChannelEvent;

use crate::error::{ChannelError, RecvError};

const DEFAULT_CAPACITY: usize = 256;

/// Identity a subscriber announces when joining a topic.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub user_id: Uuid,
    pub display_name: String,
}

/// Registry of realtime topics. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Channels {
    inner: Arc<ChannelsInner>,
}

struct ChannelsInner {
    capacity: usize,
    closed: AtomicBool,
    topics: RwLock<HashMap<String, Topic>>,
}

struct Topic {
    tx: broadcast::Sender<ChannelEvent>,
    subscribers: HashMap<Uuid, Subscriber>,
}

impl Channels {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how many undelivered events a slow subscriber can
    /// buffer before it starts lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ChannelsInner {
                capacity,
                closed: AtomicBool::new(false),
                topics: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Join a topic, creating it if this is the first subscriber.
    pub async fn subscribe(
        &self,
        topic: &str,
        subscriber: Subscriber,
    ) -> Result<Subscription, ChannelError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }

        let mut topics = self
            .inner
            .topics
            .write()
            .expect("channel registry lock poisoned");
        let entry = topics.entry(topic.to_string()).or_insert_with(|| Topic {
            tx: broadcast::channel(self.inner.capacity).0,
            subscribers: HashMap::new(),
        });

        let id = Uuid::new_v4();
        debug!(topic, user = %subscriber.user_id, "subscribed");
        entry.subscribers.insert(id, subscriber);
        let rx = entry.tx.subscribe();

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            channels: self.clone(),
            rx,
        })
    }

    /// Publish an event on a topic. Publishing to a topic with no
    /// subscribers delivers to no one and is not an error.
    pub async fn publish(&self, topic: &str, event: ChannelEvent) -> Result<(), ChannelError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }

        let topics = self
            .inner
            .topics
            .read()
            .expect("channel registry lock poisoned");
        if let Some(entry) = topics.get(topic) {
            let _ = entry.tx.send(event);
        }
        Ok(())
    }

    /// Who is currently subscribed to a topic.
    pub fn presence(&self, topic: &str) -> Vec<Subscriber> {
        let topics = self
            .inner
            .topics
            .read()
            .expect("channel registry lock poisoned");
        topics
            .get(topic)
            .map(|entry| entry.subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Tear down every topic. Existing subscriptions observe a closed
    /// stream; new subscribes and publishes are rejected.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner
            .topics
            .write()
            .expect("channel registry lock poisoned")
            .clear();
    }

    fn remove_subscription(&self, topic: &str, id: Uuid) {
        let mut topics = self
            .inner
            .topics
            .write()
            .expect("channel registry lock poisoned");
        if let Some(entry) = topics.get_mut(topic) {
            entry.subscribers.remove(&id);
            if entry.subscribers.is_empty() {
                topics.remove(topic);
            }
        }
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

/// A live membership in one topic. Dropping it (or calling
/// [`Subscription::unsubscribe`]) leaves the topic immediately; teardown is
/// unconditional, with no grace period.
pub struct Subscription {
    id: Uuid,
    topic: String,
    channels: Channels,
    rx: broadcast::Receiver<ChannelEvent>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next event on the topic.
    pub async fn recv(&mut self) -> Result<ChannelEvent, RecvError> {
        match self.rx.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(RecvError::Lagged(skipped)),
            Err(broadcast::error::RecvError::Closed) => Err(RecvError::Closed),
        }
    }

    pub fn unsubscribe(self) {
        // Drop does the cleanup.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channels.remove_subscription(&self.topic, self.id);
    }
}
