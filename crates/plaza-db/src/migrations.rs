use rusqlite::Connection;
use tracing::info;

/// Idempotent schema setup. profile_likes and chat_rooms deliberately carry
/// no UNIQUE constraint on their user pairs: racing like actions and racing
/// room resolutions can both insert duplicates, and lookups take the first
/// match.
pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT NOT NULL,
            full_name       TEXT NOT NULL,
            bio             TEXT,
            profile_image   TEXT,
            location        TEXT,
            latitude        REAL,
            longitude       REAL,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profile_likes (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            liked_user_id   TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_profile_likes_liked
            ON profile_likes(liked_user_id);

        CREATE TABLE IF NOT EXISTS chat_rooms (
            id              TEXT PRIMARY KEY,
            user1_id        TEXT NOT NULL,
            user2_id        TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chat_rooms_pair
            ON chat_rooms(user1_id, user2_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            chat_room_id    TEXT NOT NULL REFERENCES chat_rooms(id),
            sender_id       TEXT NOT NULL,
            content         TEXT,
            message_type    TEXT NOT NULL,
            file_url        TEXT,
            file_name       TEXT,
            file_type       TEXT,
            is_read         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(chat_room_id, created_at);
        ",
    )?;

    info!("store migrations complete");
    Ok(())
}
