use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::{Entity, EntityId};
use crate::error::GameError;

/// Live entities keyed by id.
///
/// Concurrent insert and lookup need no global lock.
#[derive(Default)]
pub struct EntityRegistry {
    entities: DashMap<EntityId, Arc<Entity>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the id is taken; a taken id hands the entity back.
    pub fn insert(&self, entity: Arc<Entity>) -> Result<(), Arc<Entity>> {
        match self.entities.entry(entity.id()) {
            Entry::Occupied(_) => Err(entity),
            Entry::Vacant(slot) => {
                slot.insert(entity);
                Ok(())
            }
        }
    }

    pub fn remove(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.remove(&id).map(|(_, entity)| entity)
    }

    pub fn get(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.get(&id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Id of this exact entity, if it is the one registered under its id.
    pub fn id_of(&self, entity: &Entity) -> Result<EntityId, GameError> {
        match self.entities.get(&entity.id()) {
            Some(registered) if std::ptr::eq(Arc::as_ptr(registered.value()), entity) => {
                Ok(entity.id())
            }
            _ => Err(GameError::NotRegistered(entity.id())),
        }
    }

    /// Point-in-time snapshot, ordered by id
    pub fn all(&self) -> Vec<Arc<Entity>> {
        let mut entities: Vec<_> = self.entities.iter().map(|e| Arc::clone(e.value())).collect();
        entities.sort_by_key(|e| e.id());
        entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
