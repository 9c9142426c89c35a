use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events carried on a realtime channel topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A new message was posted in the room this topic belongs to.
    NewMessage(Message),
}
