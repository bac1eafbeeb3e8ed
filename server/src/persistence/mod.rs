//! Persistence layer for the realm server.
//!
//! The game loop never blocks on I/O. Saves are queued to a background task
//! that writes through Redis to PostgreSQL; loads are answered over a oneshot.

mod cache;
pub mod codec;
mod database;

pub use cache::Cache;
pub use database::{CharacterError, CharacterRecord, Database};

use log::{error, info, warn};
use tokio::sync::{mpsc, oneshot};

/// Commands sent to the persistence background task
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Save a character to cache and database
    SaveCharacter { record: CharacterRecord },
    /// Load a character (response sent via oneshot channel)
    LoadCharacter {
        character_id: i64,
        response: oneshot::Sender<Option<CharacterRecord>>,
    },
    /// Create a new character row
    CreateCharacter {
        name: String,
        response: oneshot::Sender<Result<i64, CharacterError>>,
    },
    /// Shutdown the persistence task
    Shutdown,
}

/// Handle for sending commands to the persistence task
#[derive(Clone)]
pub struct PersistenceHandle {
    sender: mpsc::Sender<PersistenceCommand>,
}

impl PersistenceHandle {
    /// Save a character (fire and forget)
    pub fn save_character(&self, record: CharacterRecord) {
        if record.id == 0 {
            return;
        }
        if let Err(e) = self.sender.try_send(PersistenceCommand::SaveCharacter { record }) {
            warn!("Dropped character save: {}", e);
        }
    }

    pub async fn load_character(&self, character_id: i64) -> Option<CharacterRecord> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(PersistenceCommand::LoadCharacter { character_id, response: tx })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub async fn create_character(&self, name: &str) -> Result<i64, CharacterError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PersistenceCommand::CreateCharacter { name: name.to_string(), response: tx })
            .await
            .map_err(|e| CharacterError::Database(e.to_string()))?;
        rx.await.map_err(|e| CharacterError::Database(e.to_string()))?
    }

    /// Shutdown the persistence task after pending saves
    pub async fn shutdown(&self) {
        let _ = self.sender.send(PersistenceCommand::Shutdown).await;
    }
}

/// Connect to PostgreSQL and Redis and spawn the background task
pub async fn init(
    database_url: &str,
    redis_url: &str,
) -> Result<PersistenceHandle, Box<dyn std::error::Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    info!("Connected to PostgreSQL");

    let cache = Cache::connect(redis_url).await?;
    info!("Connected to Redis");

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(persistence_task(db, cache, rx));
    info!("Persistence background task started");

    Ok(PersistenceHandle { sender: tx })
}

async fn persistence_task(db: Database, cache: Cache, mut rx: mpsc::Receiver<PersistenceCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistenceCommand::SaveCharacter { record } => {
                // Cache first (fast), then permanent storage
                if let Err(e) = cache.save_character(&record).await {
                    warn!("Failed to cache character {}: {}", record.id, e);
                }
                if let Err(e) = db.save_character(&record).await {
                    error!("Failed to save character {} to database: {}", record.id, e);
                }
            }

            PersistenceCommand::LoadCharacter { character_id, response } => {
                let cached = cache.load_character(character_id).await.ok().flatten();

                let result = match cached {
                    Some(record) => {
                        info!("Loaded character {} from cache", character_id);
                        Some(record)
                    }
                    None => match db.load_character(character_id).await {
                        Ok(Some(record)) => {
                            info!("Loaded character {} from database", character_id);
                            let _ = cache.save_character(&record).await;
                            Some(record)
                        }
                        Ok(None) => {
                            info!("No saved data for character {}", character_id);
                            None
                        }
                        Err(e) => {
                            error!("Failed to load character {}: {}", character_id, e);
                            None
                        }
                    },
                };

                let _ = response.send(result);
            }

            PersistenceCommand::CreateCharacter { name, response } => {
                let result = db.create_character(&name).await;
                match &result {
                    Ok(id) => info!("Created character {} ({})", name, id),
                    Err(e) => warn!("Failed to create character {}: {}", name, e),
                }
                let _ = response.send(result);
            }

            PersistenceCommand::Shutdown => {
                info!("Persistence task shutting down");
                break;
            }
        }
    }

    info!("Persistence task stopped");
}
