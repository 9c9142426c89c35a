use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path for the reference store.
    pub db_path: PathBuf,
    /// Per-subscriber event buffer on realtime topics.
    pub channel_capacity: usize,
}

impl Config {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let db_path = std::env::var("PLAZA_DB_PATH")
            .unwrap_or_else(|_| "plaza.db".into())
            .into();
        let channel_capacity = std::env::var("PLAZA_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| "256".into())
            .parse()?;

        Ok(Self {
            db_path,
            channel_capacity,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("plaza.db"),
            channel_capacity: 256,
        }
    }
}
