use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::Game;
use crate::container::Container;
use crate::entity::{Entity, EntityId, EntityState, NewEntity};
use crate::error::GameError;
use crate::event::{kinds, StateRef};
use crate::properties::Properties;

impl Game {
    /// Register a new entity under the game root and return its id.
    ///
    /// Persistent kinds adopt the id of a single matching stored record and
    /// load its properties. An entity built with a location is placed there
    /// in the same critical section, so the creation event is followed
    /// directly by its `entity-moved` event. An unusable location fails the
    /// whole registration and nothing is published.
    pub fn register_entity(&self, new: NewEntity) -> Result<EntityId, GameError> {
        let NewEntity {
            kind,
            properties,
            location,
            heading,
            listener,
        } = new;

        let persisted = self.find_persisted(&kind, &properties);
        let id = persisted.unwrap_or_else(|| self.ids.next_entity_id());
        let candidate = Entity::new(id, kind, self.id.clone(), properties, heading);
        if persisted.is_some() {
            self.load_persisted(&candidate);
        }

        let id = {
            let mut placements = self.index.lock();

            if let Some(target) = &location {
                self.check_board_target(target)?;
                if let Container::Entity(holder) = target {
                    if !placements.is_placed(*holder) {
                        return Err(GameError::UnknownContainer(target.clone()));
                    }
                }
            }

            let mut candidate = Arc::new(candidate);
            let entity = loop {
                match self.entities.insert(Arc::clone(&candidate)) {
                    Ok(()) => break candidate,
                    Err(taken) => {
                        let fresh = self.ids.next_entity_id();
                        warn!(
                            entity_id = taken.id(),
                            fresh_id = fresh,
                            "Stored entity id already live, minting a fresh id"
                        );
                        candidate = Arc::new(taken.renumbered(fresh));
                    }
                }
            };
            let id = entity.id();

            if let Some(listener) = listener {
                self.bus.register(Arc::clone(&listener));
                self.entity_listeners.insert(id, listener);
            }
            placements.insert(id);

            let mut props = Properties::new();
            props.insert("entity-id".to_string(), json!(id));
            props.insert("entity-type".to_string(), json!(entity.kind()));
            self.bus.stage(
                kinds::ENTITY_CREATION,
                props,
                [StateRef::Entity(id), StateRef::Game],
            );

            // A new entity holds nothing, so no cycle check is needed
            if let Some(target) = location {
                let previous = placements.relocate(id, target.clone())?;
                self.stage_moved(id, &previous, &target);
            }
            debug!(entity_id = id, kind = %entity.kind(), "Entity registered");
            id
        };
        self.bus.flush();
        Ok(id)
    }

    /// Remove an entity from the game.
    ///
    /// Anything it holds is moved out to where it stood. The entity itself
    /// gets an `entity-moved` event back to the root, then `entity-deletion`.
    pub fn deregister_entity(&self, id: EntityId) -> Result<Arc<Entity>, GameError> {
        let entity = {
            let mut placements = self.index.lock();
            let location = placements.location(id)?;

            for child in placements.contents(&Container::Entity(id)) {
                let previous = placements.relocate(child, location.clone())?;
                self.stage_moved(child, &previous, &location);
            }

            let previous = placements.remove(id)?;
            self.stage_moved(id, &previous, &Container::Root);

            let entity = self
                .entities
                .remove(id)
                .ok_or(GameError::NotRegistered(id))?;
            if let Some((_, listener)) = self.entity_listeners.remove(&id) {
                self.bus.deregister(&listener);
            }

            let mut props = Properties::new();
            props.insert("entity-id".to_string(), json!(id));
            props.insert("entity-type".to_string(), json!(entity.kind()));
            self.bus.stage(
                kinds::ENTITY_DELETION,
                props,
                [StateRef::Entity(id), StateRef::Game],
            );
            entity
        };
        self.bus.flush();

        if self.is_persistent_kind(entity.kind()) {
            if let Some(store) = &self.data_store {
                if let Err(e) = store.save(entity.as_ref()) {
                    warn!(entity_id = id, error = %e, "Failed to save entity on deregistration");
                }
            }
        }
        debug!(entity_id = id, "Entity deregistered");
        Ok(entity)
    }

    /// Move a registered entity into `container`, returning where it was.
    ///
    /// Always emits `entity-moved`, even when the container is unchanged.
    pub fn move_entity(&self, id: EntityId, container: Container) -> Result<Container, GameError> {
        let previous = {
            let mut placements = self.index.lock();
            // Under the lock so a board being removed cannot gain entities
            self.check_board_target(&container)?;
            placements.check_target(id, &container)?;
            let previous = placements.relocate(id, container.clone())?;
            self.stage_moved(id, &previous, &container);
            previous
        };
        self.bus.flush();
        Ok(previous)
    }

    /// Set an entity property and emit `entity-updated`. Returns the old value.
    pub fn set_entity_property(
        &self,
        id: EntityId,
        key: &str,
        value: Value,
    ) -> Result<Option<Value>, GameError> {
        if key == "id" {
            return Err(GameError::Immutable("entity id"));
        }
        let entity = self.entity(id).ok_or(GameError::NotRegistered(id))?;

        let old = {
            // Under the index lock so the event is ordered with placement changes
            let placements = self.index.lock();
            if !placements.is_placed(id) {
                return Err(GameError::NotRegistered(id));
            }
            let old = entity.replace_property(key, value.clone());

            let mut props = Properties::new();
            props.insert("entity-id".to_string(), json!(id));
            props.insert("property".to_string(), json!(key));
            props.insert("old-value".to_string(), old.clone().unwrap_or(Value::Null));
            props.insert("new-value".to_string(), value);
            self.bus
                .stage(kinds::ENTITY_UPDATED, props, [StateRef::Entity(id)]);
            old
        };
        self.bus.flush();
        Ok(old)
    }

    /// Persist an entity's current properties.
    pub fn save_entity(&self, id: EntityId) -> Result<(), GameError> {
        let entity = self.entity(id).ok_or(GameError::NotRegistered(id))?;
        let store = self
            .data_store
            .as_ref()
            .ok_or_else(|| GameError::NotFound("data store".to_string()))?;
        store.save(entity.as_ref())?;
        Ok(())
    }

    pub fn entity(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.get(id)
    }

    /// Id of this exact entity instance; fails if it is not the registered one.
    pub fn entity_id_of(&self, entity: &Entity) -> Result<EntityId, GameError> {
        self.entities.id_of(entity)
    }

    /// Snapshot of every registered entity, ordered by id
    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.entities.all()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn location_of(&self, id: EntityId) -> Result<Container, GameError> {
        self.index.location_of(id)
    }

    /// Snapshot of the entities directly inside `container`
    pub fn contents_of(&self, container: &Container) -> Vec<EntityId> {
        self.index.contents_of(container)
    }

    pub fn contains(&self, container: &Container, id: EntityId) -> bool {
        self.index.contains(container, id)
    }

    /// The tile an entity ultimately sits on, resolving one level of nesting.
    pub fn top_level_location_of(&self, id: EntityId) -> Result<Option<Container>, GameError> {
        self.index.top_level_location_of(id)
    }

    /// True when the forward and reverse placement maps agree with each
    /// other and with the registry.
    pub fn is_consistent(&self) -> bool {
        self.index.is_consistent() && self.index.len() == self.entities.len()
    }

    pub fn entity_state(&self, id: EntityId) -> Result<EntityState, GameError> {
        let location = self.location_of(id)?;
        let entity = self.entity(id).ok_or(GameError::NotRegistered(id))?;
        Ok(EntityState::of(&entity, location))
    }

    /// Capability view of a container.
    pub fn container(&self, container: Container) -> ContainerHandle<'_> {
        ContainerHandle {
            game: self,
            container,
        }
    }

    fn stage_moved(&self, id: EntityId, previous: &Container, current: &Container) {
        let mut props = Properties::new();
        props.insert("entity".to_string(), json!(id));
        previous.describe_into("previous-", &mut props);
        current.describe_into("", &mut props);
        self.bus.stage(
            kinds::ENTITY_MOVED,
            props,
            [StateRef::Entity(id), previous.state_ref(), current.state_ref()],
        );
    }

    /// Tiles must belong to a board the game knows.
    fn check_board_target(&self, container: &Container) -> Result<(), GameError> {
        let Some(tile) = container.as_tile() else {
            return Ok(());
        };
        let board = self
            .board(&tile.board)
            .ok_or_else(|| GameError::UnknownBoard(tile.board.clone()))?;
        if !board.contains_tile(tile) {
            return Err(GameError::UnknownContainer(container.clone()));
        }
        Ok(())
    }

    /// Stored id for a persistent kind, if exactly one record matches.
    fn find_persisted(&self, kind: &str, properties: &Properties) -> Option<EntityId> {
        if !self.is_persistent_kind(kind) {
            return None;
        }
        let store = self.data_store.as_ref()?;

        match store.search(properties) {
            Ok(ids) if ids.len() == 1 => ids.first().copied(),
            Ok(ids) => {
                debug!(kind = %kind, matches = ids.len(), "No unique stored entity, minting a fresh id");
                None
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Data store search failed, minting a fresh id");
                None
            }
        }
    }

    fn load_persisted(&self, entity: &Entity) {
        let Some(store) = &self.data_store else {
            return;
        };
        if let Err(e) = store.load(entity) {
            warn!(entity_id = entity.id(), error = %e, "Failed to load stored entity properties");
        }
    }
}

/// A container seen through its capabilities: holding, releasing and
/// listing entities. Every operation goes through the game's index.
pub struct ContainerHandle<'a> {
    game: &'a Game,
    container: Container,
}

impl ContainerHandle<'_> {
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Move an entity into this container.
    pub fn add(&self, id: EntityId) -> Result<(), GameError> {
        self.game.move_entity(id, self.container.clone()).map(|_| ())
    }

    /// Release an entity held here back to the game root.
    pub fn remove(&self, id: EntityId) -> Result<(), GameError> {
        if !self.contains(id) {
            return Err(GameError::NotFound(format!("entity {} in {}", id, self.container)));
        }
        self.game.move_entity(id, Container::Root).map(|_| ())
    }

    pub fn entities(&self) -> Vec<EntityId> {
        self.game.contents_of(&self.container)
    }

    pub fn is_empty(&self) -> bool {
        self.entities().is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.game.contains(&self.container, id)
    }
}
