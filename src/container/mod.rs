// Containers and the entity placement index

mod index;

pub use index::{ContainerIndex, PlacementGuard};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::entity::EntityId;
use crate::event::StateRef;
use crate::properties::Properties;


/// A single board cell, identified by board name and grid position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileRef {
    pub board: String,
    pub row: u32,
    pub column: u32,
}

impl TileRef {
    pub fn new(board: impl Into<String>, row: u32, column: u32) -> Self {
        Self {
            board: board.into(),
            row,
            column,
        }
    }
}

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.board, self.row, self.column)
    }
}

/// Anything that can hold entities.
///
/// Containment itself is tracked by [`ContainerIndex`], never inside the
/// container value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "kebab-case")]
pub enum Container {
    /// The game itself; default location of every entity
    #[default]
    Root,
    Tile(TileRef),
    /// Another entity acting as a container (e.g. a chest)
    Entity(EntityId),
}

impl Container {
    pub fn tile(board: impl Into<String>, row: u32, column: u32) -> Self {
        Container::Tile(TileRef::new(board, row, column))
    }

    pub fn as_tile(&self) -> Option<&TileRef> {
        match self {
            Container::Tile(tile) => Some(tile),
            _ => None,
        }
    }

    /// Writes this container's location fields into event properties.
    ///
    /// Tiles contribute `board`, `row` and `column`; entity containers
    /// contribute `entity-container`; the root contributes nothing.
    pub fn describe_into(&self, prefix: &str, properties: &mut Properties) {
        match self {
            Container::Root => {}
            Container::Tile(tile) => {
                properties.insert(format!("{prefix}board"), json!(tile.board));
                properties.insert(format!("{prefix}row"), json!(tile.row));
                properties.insert(format!("{prefix}column"), json!(tile.column));
            }
            Container::Entity(id) => {
                properties.insert(format!("{prefix}entity-container"), json!(id));
            }
        }
    }

    pub fn state_ref(&self) -> StateRef {
        match self {
            Container::Root => StateRef::Game,
            Container::Tile(tile) => StateRef::Tile(tile.clone()),
            Container::Entity(id) => StateRef::Entity(*id),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Root => write!(f, "game root"),
            Container::Tile(tile) => write!(f, "tile {}", tile),
            Container::Entity(id) => write!(f, "entity {}", id),
        }
    }
}
