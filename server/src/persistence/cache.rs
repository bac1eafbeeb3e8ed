//! Redis cache operations for hot character data.

use redis::{aio::ConnectionManager, AsyncCommands};

use super::database::CharacterRecord;

const CHARACTER_PREFIX: &str = "char:";

/// TTL for cached data (1 hour)
const CACHE_TTL_SECONDS: u64 = 3600;

fn character_key(character_id: i64) -> String {
    format!("{}{}", CHARACTER_PREFIX, character_id)
}

/// Redis cache wrapper
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl Cache {
    /// Connect to Redis
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn save_character(&self, record: &CharacterRecord) -> Result<(), redis::RedisError> {
        let json = serde_json::to_string(record).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "serialize", e.to_string()))
        })?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(character_key(record.id), json, CACHE_TTL_SECONDS).await?;

        Ok(())
    }

    /// Cached record, if present and readable
    pub async fn load_character(&self, character_id: i64) -> Result<Option<CharacterRecord>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(character_key(character_id)).await?;

        Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
    }
}
