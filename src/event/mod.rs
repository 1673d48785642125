use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::container::TileRef;
use crate::entity::EntityId;
use crate::error::GameError;
use crate::properties::{HasProperties, Properties};

mod bus;

pub use bus::EventBus;

pub type EventId = u64;

/// Event type tags emitted by the state engine
pub mod kinds {
    pub const ENTITY_CREATION: &str = "entity-creation";
    pub const ENTITY_MOVED: &str = "entity-moved";
    pub const ENTITY_DELETION: &str = "entity-deletion";
    pub const ENTITY_UPDATED: &str = "entity-updated";
}

/// Reference to a piece of game state an event describes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "kebab-case")]
pub enum StateRef {
    Game,
    Tile(TileRef),
    Entity(EntityId),
    Agent(String),
}

/// An immutable record of something that happened in a game.
///
/// Ids increase strictly within one game. `time` is game time in
/// milliseconds. The `id` is also present in `properties`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    #[serde(rename = "type")]
    kind: String,
    time: u64,
    #[serde(default)]
    properties: Properties,
    #[serde(skip)]
    updated_state: BTreeSet<StateRef>,
}

impl Event {
    pub(crate) fn new(
        id: EventId,
        kind: &str,
        time: u64,
        mut properties: Properties,
        updated_state: impl IntoIterator<Item = StateRef>,
    ) -> Self {
        properties.insert("id".to_string(), json!(id));
        Self {
            id,
            kind: kind.to_string(),
            time,
            properties,
            updated_state: updated_state.into_iter().collect(),
        }
    }

    /// Parse an event received from the transport, in the same layout
    /// events are serialized with.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let mut event: Event = serde_json::from_str(text).context("Malformed event")?;
        if event.kind.is_empty() {
            anyhow::bail!("Event has an empty type");
        }
        event.properties.insert("id".to_string(), json!(event.id));
        Ok(event)
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    /// Type tag, e.g. `entity-moved`
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Milliseconds since game start when the event occurred
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn updated_state(&self) -> impl Iterator<Item = &StateRef> {
        self.updated_state.iter()
    }

    pub fn describes(&self, state: &StateRef) -> bool {
        self.updated_state.contains(state)
    }
}

impl HasProperties for Event {
    fn properties(&self) -> Properties {
        self.properties.clone()
    }

    fn set_property(&self, _key: &str, _value: Value) -> Result<(), GameError> {
        Err(GameError::Immutable("event"))
    }
}

/// Receives every event published by a game.
///
/// Errors and panics are logged by the bus and never reach other listeners.
pub trait EventListener: Send + Sync {
    fn accept_event(&self, event: &Event) -> anyhow::Result<()>;
}

impl<F> EventListener for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn accept_event(&self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}
