//! Persistence collaborator contract and implementations.
//!
//! Records are property maps keyed by their `id` property: numeric entity
//! ids in decimal, agent ids as-is.

mod sqlite;

pub use sqlite::SqliteDataStore;

use anyhow::{Context, Result};
use dashmap::DashMap;

use crate::entity::EntityId;
use crate::properties::{record_key, HasProperties, Properties};

/// Load/search/save of object properties.
pub trait DataStore: Send + Sync {
    /// Store the object's current properties under its id.
    fn save(&self, object: &dyn HasProperties) -> Result<()>;

    /// Populate the object from storage by its id. Returns false if nothing is stored.
    fn load(&self, object: &dyn HasProperties) -> Result<bool>;

    /// Ids of stored entities whose properties match every criterion (`id` ignored).
    fn search(&self, criteria: &Properties) -> Result<Vec<EntityId>>;

    /// Largest stored entity id, 0 when there are none
    fn max_entity_id(&self) -> Result<EntityId>;
}

pub(crate) fn key_of(object: &dyn HasProperties) -> Result<String> {
    object
        .property("id")
        .as_ref()
        .and_then(record_key)
        .context("Object has no usable 'id' property")
}

pub(crate) fn matches(record: &Properties, criteria: &Properties) -> bool {
    criteria
        .iter()
        .filter(|(key, _)| key.as_str() != "id")
        .all(|(key, value)| record.get(key) == Some(value))
}

/// Copy stored properties onto the object; the id is never overwritten.
pub(crate) fn apply_record(object: &dyn HasProperties, record: Properties) -> Result<()> {
    for (key, value) in record {
        if key != "id" {
            object
                .set_property(&key, value)
                .with_context(|| format!("Failed to set loaded property '{}'", key))?;
        }
    }
    Ok(())
}

/// Volatile store, useful for tests and single-process games.
#[derive(Default)]
pub struct InMemoryDataStore {
    records: DashMap<String, Properties>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DataStore for InMemoryDataStore {
    fn save(&self, object: &dyn HasProperties) -> Result<()> {
        let key = key_of(object)?;
        self.records.insert(key, object.properties());
        Ok(())
    }

    fn load(&self, object: &dyn HasProperties) -> Result<bool> {
        let key = key_of(object)?;
        // Clone out first so set_property never runs under a shard lock
        let record = self.records.get(&key).map(|r| r.value().clone());
        match record {
            Some(record) => {
                apply_record(object, record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn search(&self, criteria: &Properties) -> Result<Vec<EntityId>> {
        let mut ids: Vec<EntityId> = self
            .records
            .iter()
            .filter(|r| matches(r.value(), criteria))
            .filter_map(|r| r.key().parse().ok())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn max_entity_id(&self) -> Result<EntityId> {
        Ok(self
            .records
            .iter()
            .filter_map(|r| r.key().parse::<EntityId>().ok())
            .max()
            .unwrap_or(0))
    }
}
