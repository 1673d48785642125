use anyhow::{Context, Result};
use serde::Deserialize;

pub use crate::nats::NatsConfig;

/// Complete server configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TileStateConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
}

/// Game instance configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_game_id")]
    pub id: String,
    /// Game time already elapsed, for resumed games (milliseconds)
    #[serde(default)]
    pub elapsed_offset_ms: u64,
    /// Pause between loop ticks (milliseconds, 0 = no pause)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_game_id() -> String {
    "tilestate".to_string()
}

fn default_tick_interval() -> u64 {
    50
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            id: default_game_id(),
            elapsed_offset_ms: 0,
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Entity type configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitiesConfig {
    /// Entity kinds looked up in and saved to the data store
    #[serde(default)]
    pub persistent_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Data store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite database file (sqlite backend only)
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "tilestate.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// A board loaded at startup from an ASCII map (`#` = wall)
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    pub map: String,
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<TileStateConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: TileStateConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
