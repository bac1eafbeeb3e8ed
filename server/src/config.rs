//! Server configuration and the explicit game context.
//!
//! Configuration is a flat table of numeric keys (`ChatMaxWidth`, `MaxLevel`,
//! ...) read from a JSON object. Missing keys fall back to built-in defaults,
//! so an absent or partial file still yields a usable server.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use realm_shared::{get_item_definitions, get_spell_definitions, ItemDef, SpellDef};

/// Default configuration file path (overridden by `REALM_CONFIG`)
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Built-in defaults for every key the server reads
const DEFAULTS: &[(&str, f64)] = &[
    ("ChatMaxWidth", 1400.0),
    ("MaxLevel", 250.0),
    ("StatPerLevel", 3.0),
    ("SkillPerLevel", 3.0),
    ("MaxItem", 10_000_000.0),
    ("MaxTrade", 10_000_000.0),
    ("PartyShareMode", 2.0),
    ("SaveInterval", 60.0),
];

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    NotNumeric(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Failed to read config: {}", e),
            Self::Parse(e) => write!(f, "Failed to parse config: {}", e),
            Self::NotNumeric(key) => write!(f, "Config key '{}' is not a number", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Keyed numeric configuration lookup
#[derive(Debug, Clone)]
pub struct Config {
    values: HashMap<String, f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            values: DEFAULTS.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

impl Config {
    /// Parse a JSON object of numbers, layered over the defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: HashMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut config = Self::default();
        for (key, value) in table {
            let number = value.as_f64().ok_or_else(|| ConfigError::NotNumeric(key.clone()))?;
            config.values.insert(key, number);
        }
        Ok(config)
    }

    /// Load from a file; a missing file means defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = Self::from_json(&json)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Raw lookup. Unknown keys read as 0.
    pub fn get(&self, key: &str) -> f64 {
        match self.values.get(key) {
            Some(v) => *v,
            None => {
                warn!("Unknown config key '{}'", key);
                0.0
            }
        }
    }

    pub fn get_i32(&self, key: &str) -> i32 {
        self.get(key) as i32
    }

    #[cfg(test)]
    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), value);
    }

    pub fn chat_max_width(&self) -> i32 {
        self.get_i32("ChatMaxWidth")
    }

    pub fn max_level(&self) -> u8 {
        self.get_i32("MaxLevel").clamp(0, u8::MAX as i32 - 1) as u8
    }

    pub fn stat_per_level(&self) -> i16 {
        self.get_i32("StatPerLevel") as i16
    }

    pub fn skill_per_level(&self) -> i16 {
        self.get_i32("SkillPerLevel") as i16
    }

    pub fn max_item(&self) -> i32 {
        self.get_i32("MaxItem")
    }

    pub fn max_trade(&self) -> i32 {
        self.get_i32("MaxTrade")
    }

    pub fn party_share_mode(&self) -> u8 {
        self.get_i32("PartyShareMode").clamp(0, u8::MAX as i32) as u8
    }

    pub fn save_interval_secs(&self) -> u64 {
        self.get_i32("SaveInterval").max(1) as u64
    }
}

/// Cumulative experience needed to reach each level
#[derive(Debug, Clone)]
pub struct ExpTable {
    thresholds: Vec<i32>,
}

impl ExpTable {
    /// Thresholds for levels `0..=max_level + 1`: `round(level^3 * 133.1)`
    pub fn new(max_level: u8) -> Self {
        let thresholds = (0..=max_level as u32 + 1)
            .map(|level| (f64::from(level).powi(3) * 133.1).round() as i32)
            .collect();
        Self { thresholds }
    }

    /// Experience needed for `level`; unreachable past the end of the table
    pub fn threshold(&self, level: usize) -> i32 {
        self.thresholds.get(level).copied().unwrap_or(i32::MAX)
    }
}

/// Everything character and party operations read from the outside world,
/// passed explicitly instead of reached through globals.
#[derive(Debug, Clone)]
pub struct GameContext {
    pub config: Config,
    pub exp_table: ExpTable,
    pub items: HashMap<i16, ItemDef>,
    pub spells: HashMap<i16, SpellDef>,
}

impl GameContext {
    /// Context with the built-in item and spell tables
    pub fn new(config: Config) -> Self {
        let exp_table = ExpTable::new(config.max_level());
        let items = get_item_definitions().into_iter().map(|i| (i.id, i)).collect();
        let spells = get_spell_definitions().into_iter().map(|s| (s.id, s)).collect();

        Self { config, exp_table, items, spells }
    }

    pub fn item(&self, id: i16) -> Option<&ItemDef> {
        self.items.get(&id)
    }

    pub fn spell(&self, id: i16) -> Option<&SpellDef> {
        self.spells.get(&id)
    }
}
