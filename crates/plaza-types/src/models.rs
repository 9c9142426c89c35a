use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directory profile. Created once at profile creation and mutated by the
/// owning user only; profiles are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A like edge from one user to another's profile. Unique per
/// (user_id, liked_user_id) in practice, but the store carries no constraint,
/// so racing like actions can leave duplicate edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileLike {
    pub id: Uuid,
    pub user_id: Uuid,
    pub liked_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A two-party chat room. Stored as an ordered pair but looked up in both
/// orientations; participant ids are fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Video,
    File,
}

/// A message in exactly one chat room. Immutable once created; the id is the
/// dedup key across the optimistic-append and realtime-receive paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    pub message_type: MessageType,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// The signed-in identity, as handed out by the auth session. Distinct from
/// a directory [`User`]: an authenticated identity may not have created a
/// profile yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Short handle for display and presence: the display name if set,
    /// otherwise the local part of the email, otherwise "user".
    pub fn handle(&self) -> String {
        if let Some(name) = self.display_name.as_deref()
            && !name.is_empty()
        {
            return name.to_string();
        }
        self.email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "user".to_string())
    }
}
