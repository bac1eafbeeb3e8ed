//! PostgreSQL database operations.

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::entities::Character;

/// Stored form of a character. Collections are kept in their compact text
/// encodings (see `codec`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: i64,
    pub name: String,
    pub map_id: i16,
    pub level: i16,
    pub experience: i32,
    pub hp: i16,
    pub tp: i16,
    pub str: i16,
    pub intl: i16,
    pub wis: i16,
    pub agi: i16,
    pub con: i16,
    pub cha: i16,
    pub stat_points: i16,
    pub skill_points: i16,
    pub hidden: i32,
    pub inventory: String,
    pub spells: String,
    pub paperdoll: String,
}

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Create an empty character row, returning its id
    pub async fn create_character(&self, name: &str) -> Result<i64, CharacterError> {
        if !Character::valid_name(name) {
            return Err(CharacterError::InvalidName(name.to_string()));
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM characters WHERE name = $1)"
        )
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CharacterError::Database(e.to_string()))?;

        if exists {
            return Err(CharacterError::NameTaken);
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO characters (name) VALUES ($1) RETURNING id"
        )
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CharacterError::Database(e.to_string()))?;

        Ok(id)
    }

    /// Load a character by id
    pub async fn load_character(&self, character_id: i64) -> Result<Option<CharacterRecord>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, name, map_id, level, experience, hp, tp,
                    str, intl, wis, agi, con, cha,
                    stat_points, skill_points, hidden,
                    inventory, spells, paperdoll
             FROM characters WHERE id = $1"
        )
            .bind(character_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| CharacterRecord {
            id: r.get("id"),
            name: r.get("name"),
            map_id: r.get("map_id"),
            level: r.get("level"),
            experience: r.get("experience"),
            hp: r.get("hp"),
            tp: r.get("tp"),
            str: r.get("str"),
            intl: r.get("intl"),
            wis: r.get("wis"),
            agi: r.get("agi"),
            con: r.get("con"),
            cha: r.get("cha"),
            stat_points: r.get("stat_points"),
            skill_points: r.get("skill_points"),
            hidden: r.get("hidden"),
            inventory: r.get::<Option<String>, _>("inventory").unwrap_or_default(),
            spells: r.get::<Option<String>, _>("spells").unwrap_or_default(),
            paperdoll: r.get::<Option<String>, _>("paperdoll").unwrap_or_default(),
        }))
    }

    /// Save a character
    pub async fn save_character(&self, record: &CharacterRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE characters SET
                map_id = $2, level = $3, experience = $4, hp = $5, tp = $6,
                str = $7, intl = $8, wis = $9, agi = $10, con = $11, cha = $12,
                stat_points = $13, skill_points = $14, hidden = $15,
                inventory = $16, spells = $17, paperdoll = $18,
                last_saved = NOW()
             WHERE id = $1"
        )
            .bind(record.id)
            .bind(record.map_id)
            .bind(record.level)
            .bind(record.experience)
            .bind(record.hp)
            .bind(record.tp)
            .bind(record.str)
            .bind(record.intl)
            .bind(record.wis)
            .bind(record.agi)
            .bind(record.con)
            .bind(record.cha)
            .bind(record.stat_points)
            .bind(record.skill_points)
            .bind(record.hidden)
            .bind(&record.inventory)
            .bind(&record.spells)
            .bind(&record.paperdoll)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Character creation errors
#[derive(Debug)]
pub enum CharacterError {
    NameTaken,
    InvalidName(String),
    Database(String),
}

impl std::fmt::Display for CharacterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameTaken => write!(f, "Character name already taken"),
            Self::InvalidName(name) => write!(f, "Invalid name: {}", name),
            Self::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for CharacterError {}
