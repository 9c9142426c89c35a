#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The registry was shut down; no topic accepts subscribers or events.
    #[error("realtime channels are shut down")]
    Closed,
}

impl ChannelError {
    pub fn is_transient(&self) -> bool {
        // Shutdown is deliberate; retrying cannot help.
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    /// The subscriber fell behind and `skipped` events were dropped.
    #[error("subscription lagged, {0} events skipped")]
    Lagged(u64),

    /// The topic is gone; no further events will arrive.
    #[error("topic closed")]
    Closed,
}
