// Entities and the live entity registry

mod registry;

pub use registry::EntityRegistry;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::board::Direction;
use crate::container::Container;
use crate::error::GameError;
use crate::event::EventListener;
use crate::properties::{HasProperties, Properties};


pub type EntityId = u64;

/// An addressable, stateful game object.
///
/// The id is assigned once, at registration, and never changes. Properties
/// and heading are mutable and safe to touch from any thread.
pub struct Entity {
    id: EntityId,
    kind: String,
    game_id: String,
    properties: RwLock<Properties>,
    heading: RwLock<Option<Direction>>,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        kind: String,
        game_id: String,
        mut properties: Properties,
        heading: Option<Direction>,
    ) -> Self {
        // The id lives in its own field; a stale copy in the map would only confuse lookups
        properties.remove("id");
        Self {
            id,
            kind,
            game_id,
            properties: RwLock::new(properties),
            heading: RwLock::new(heading),
        }
    }

    /// Same kind, properties and heading under a different id.
    pub(crate) fn renumbered(&self, id: EntityId) -> Self {
        Self::new(
            id,
            self.kind.clone(),
            self.game_id.clone(),
            self.properties.read().clone(),
            *self.heading.read(),
        )
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Entity type, e.g. "player" or "crate"
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Id of the game that owns this entity
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn heading(&self) -> Option<Direction> {
        *self.heading.read()
    }

    pub fn set_heading(&self, heading: Option<Direction>) {
        *self.heading.write() = heading;
    }

    /// Replace a property, returning the previous value.
    pub(crate) fn replace_property(&self, key: &str, value: Value) -> Option<Value> {
        self.properties.write().insert(key.to_string(), value)
    }
}

impl HasProperties for Entity {
    fn properties(&self) -> Properties {
        let mut properties = self.properties.read().clone();
        properties.insert("id".to_string(), json!(self.id));
        properties
    }

    /// Writes the property directly, without an `entity-updated` event.
    /// Use `Game::set_entity_property` to change a registered entity
    /// observably. The id is fixed.
    fn set_property(&self, key: &str, value: Value) -> Result<(), GameError> {
        if key == "id" {
            return Err(GameError::Immutable("entity id"));
        }
        self.replace_property(key, value);
        Ok(())
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("heading", &self.heading())
            .field("properties", &*self.properties.read())
            .finish()
    }
}

/// Everything needed to register a new entity.
pub struct NewEntity {
    pub(crate) kind: String,
    pub(crate) properties: Properties,
    pub(crate) location: Option<Container>,
    pub(crate) heading: Option<Direction>,
    pub(crate) listener: Option<Arc<dyn EventListener>>,
}

impl NewEntity {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Properties::new(),
            location: None,
            heading: None,
            listener: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Move the entity here right after registration.
    pub fn at(mut self, container: Container) -> Self {
        self.location = Some(container);
        self
    }

    pub fn facing(mut self, heading: Direction) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Receive game events for as long as the entity is registered.
    pub fn listening(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

/// Serializable snapshot of an entity, handed to the transport sink.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityState {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<Direction>,
    pub location: Container,
    pub properties: Properties,
}

impl EntityState {
    pub fn of(entity: &Entity, location: Container) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind().to_string(),
            heading: entity.heading(),
            location,
            properties: entity.properties.read().clone(),
        }
    }
}
