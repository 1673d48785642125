use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeSet, HashMap};

use super::Container;
use crate::entity::EntityId;
use crate::error::GameError;

/// Forward and reverse placement maps. Only ever touched under the index lock.
#[derive(Debug, Default)]
struct Placements {
    /// entity -> the one container holding it
    locations: HashMap<EntityId, Container>,
    /// container -> entities it holds
    contents: HashMap<Container, BTreeSet<EntityId>>,
}

/// Tracks which container holds each registered entity.
///
/// All mutations happen through a [`PlacementGuard`], so readers never see
/// the forward and reverse maps disagree.
#[derive(Debug, Default)]
pub struct ContainerIndex {
    placements: Mutex<Placements>,
}

impl ContainerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the index's critical section.
    pub fn lock(&self) -> PlacementGuard<'_> {
        PlacementGuard {
            placements: self.placements.lock(),
        }
    }

    pub fn location_of(&self, entity: EntityId) -> Result<Container, GameError> {
        self.lock().location(entity)
    }

    /// Snapshot of the container's contents
    pub fn contents_of(&self, container: &Container) -> Vec<EntityId> {
        self.lock().contents(container)
    }

    pub fn contains(&self, container: &Container, entity: EntityId) -> bool {
        self.lock().contains(container, entity)
    }

    pub fn top_level_location_of(&self, entity: EntityId) -> Result<Option<Container>, GameError> {
        self.lock().top_level_location(entity)
    }

    /// Number of placed entities
    pub fn len(&self) -> usize {
        self.lock().placements.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every forward entry has a matching reverse entry and vice versa.
    pub fn is_consistent(&self) -> bool {
        let guard = self.lock();
        let p = &guard.placements;

        let forward_ok = p.locations.iter().all(|(entity, container)| {
            p.contents
                .get(container)
                .is_some_and(|held| held.contains(entity))
        });
        let reverse_ok = p.contents.iter().all(|(container, held)| {
            !held.is_empty()
                && held
                    .iter()
                    .all(|entity| p.locations.get(entity) == Some(container))
        });

        forward_ok && reverse_ok
    }
}

/// Exclusive access to the placement maps.
///
/// Callers stage the event describing a mutation while still holding the
/// guard, so event order matches mutation order.
pub struct PlacementGuard<'a> {
    placements: MutexGuard<'a, Placements>,
}

impl PlacementGuard<'_> {
    /// Place a newly registered entity under the game root.
    pub fn insert(&mut self, entity: EntityId) {
        self.detach(entity);
        self.attach(entity, Container::Root);
    }

    /// Move a placed entity and return its previous container.
    ///
    /// Moving to the current container is not short-circuited.
    pub fn relocate(&mut self, entity: EntityId, container: Container) -> Result<Container, GameError> {
        let previous = self
            .detach(entity)
            .ok_or(GameError::NotRegistered(entity))?;
        self.attach(entity, container);
        Ok(previous)
    }

    /// Remove an entity from the index entirely, returning where it was.
    pub fn remove(&mut self, entity: EntityId) -> Result<Container, GameError> {
        self.detach(entity).ok_or(GameError::NotRegistered(entity))
    }

    pub fn location(&self, entity: EntityId) -> Result<Container, GameError> {
        self.placements
            .locations
            .get(&entity)
            .cloned()
            .ok_or(GameError::NotRegistered(entity))
    }

    pub fn is_placed(&self, entity: EntityId) -> bool {
        self.placements.locations.contains_key(&entity)
    }

    pub fn contents(&self, container: &Container) -> Vec<EntityId> {
        self.placements
            .contents
            .get(container)
            .map(|held| held.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, container: &Container, entity: EntityId) -> bool {
        self.placements
            .contents
            .get(container)
            .is_some_and(|held| held.contains(&entity))
    }

    /// Resolves one level of entity-in-entity nesting.
    ///
    /// An entity held by another entity reports that entity's container; an
    /// entity on a tile reports the tile; anything else reports `None`.
    pub fn top_level_location(&self, entity: EntityId) -> Result<Option<Container>, GameError> {
        match self.location(entity)? {
            Container::Entity(holder) => self.location(holder).map(Some),
            tile @ Container::Tile(_) => Ok(Some(tile)),
            Container::Root => Ok(None),
        }
    }

    /// Check that `entity` may be moved into `container`.
    pub fn check_target(&self, entity: EntityId, container: &Container) -> Result<(), GameError> {
        if !self.is_placed(entity) {
            return Err(GameError::NotRegistered(entity));
        }

        let Container::Entity(holder) = container else {
            return Ok(());
        };
        if !self.is_placed(*holder) {
            return Err(GameError::UnknownContainer(container.clone()));
        }

        // Walk up from the target; meeting the entity itself means a cycle
        let mut cursor = Some(*holder);
        while let Some(current) = cursor {
            if current == entity {
                return Err(GameError::ContainmentCycle {
                    entity,
                    container: container.clone(),
                });
            }
            cursor = match self.placements.locations.get(&current) {
                Some(Container::Entity(next)) => Some(*next),
                _ => None,
            };
        }

        Ok(())
    }

    fn attach(&mut self, entity: EntityId, container: Container) {
        self.placements
            .contents
            .entry(container.clone())
            .or_default()
            .insert(entity);
        self.placements.locations.insert(entity, container);
    }

    fn detach(&mut self, entity: EntityId) -> Option<Container> {
        let previous = self.placements.locations.remove(&entity)?;
        if let Some(held) = self.placements.contents.get_mut(&previous) {
            held.remove(&entity);
            if held.is_empty() {
                self.placements.contents.remove(&previous);
            }
        }
        Some(previous)
    }
}
