// Board/tile geometry collaborator

mod grid;

pub use grid::GridBoard;

use serde::{Deserialize, Serialize};

use crate::container::TileRef;
use crate::entity::EntityId;
use crate::properties::Properties;

/// Compass direction on a board; also an entity's heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// (row, column) step
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

/// Spatial collaborator: the game treats tiles as opaque containers and
/// asks the board for geometry.
pub trait Board: Send + Sync {
    fn name(&self) -> &str;

    /// Every tile on the board, row-major
    fn tiles(&self) -> Vec<TileRef>;

    fn contains_tile(&self, tile: &TileRef) -> bool;

    fn tile_properties(&self, tile: &TileRef) -> Properties;

    fn adjacent_tile(&self, tile: &TileRef, direction: Direction) -> Option<TileRef>;

    /// Direction leading from `from` to the neighbouring tile `to`, if they touch.
    fn adjacent_tile_direction(&self, from: &TileRef, to: &TileRef) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| self.adjacent_tile(from, *d).as_ref() == Some(to))
    }
}

/// Serializable board snapshot for the transport sink
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardState {
    pub name: String,
    pub tiles: Vec<TileState>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileState {
    pub row: u32,
    pub column: u32,
    pub properties: Properties,
    /// Entities directly on the tile
    pub entities: Vec<EntityId>,
}
