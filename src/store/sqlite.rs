//! Record persistence using SQLite.
//!
//! One row per record; properties are stored as a JSON object.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

use super::{apply_record, key_of, matches, DataStore};
use crate::entity::EntityId;
use crate::properties::{HasProperties, Properties};

/// Persists entity and agent records in SQLite.
pub struct SqliteDataStore {
    conn: Mutex<Connection>,
}

impl SqliteDataStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open data store at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Data store connection lock poisoned"))
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                id         TEXT PRIMARY KEY,
                properties TEXT NOT NULL
            );",
        )
        .context("Failed to create records table")?;
        Ok(())
    }

    /// Every stored record as (id, properties)
    fn load_all(&self) -> Result<Vec<(String, Properties)>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT id, properties FROM records")
            .context("Failed to prepare load_all query")?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let body: String = row.get(1)?;
                Ok((id, body))
            })
            .context("Failed to query records")?;

        let mut records = Vec::new();
        for row in rows {
            let (id, body) = row.context("Failed to read record row")?;
            let properties = serde_json::from_str(&body)
                .with_context(|| format!("Failed to parse properties for record {}", id))?;
            records.push((id, properties));
        }
        Ok(records)
    }
}

impl DataStore for SqliteDataStore {
    fn save(&self, object: &dyn HasProperties) -> Result<()> {
        let key = key_of(object)?;
        let body = serde_json::to_string(&object.properties())
            .context("Failed to serialize record properties")?;

        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO records (id, properties) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET properties = excluded.properties",
            params![key, body],
        )
        .with_context(|| format!("Failed to save record {}", key))?;
        Ok(())
    }

    fn load(&self, object: &dyn HasProperties) -> Result<bool> {
        let key = key_of(object)?;
        let body: Option<String> = {
            let conn = self.connection()?;
            conn.query_row(
                "SELECT properties FROM records WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to load record {}", key))?
        };

        let Some(body) = body else {
            return Ok(false);
        };
        let record: Properties = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse properties for record {}", key))?;
        apply_record(object, record)?;
        Ok(true)
    }

    fn search(&self, criteria: &Properties) -> Result<Vec<EntityId>> {
        let mut ids: Vec<EntityId> = self
            .load_all()?
            .into_iter()
            .filter(|(_, record)| matches(record, criteria))
            .filter_map(|(id, _)| id.parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn max_entity_id(&self) -> Result<EntityId> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter_map(|(id, _)| id.parse::<EntityId>().ok())
            .max()
            .unwrap_or(0))
    }
}
