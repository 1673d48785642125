use anyhow::{bail, Result};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{Board, Direction};
use crate::container::TileRef;
use crate::properties::Properties;

/// Rectangular board with 4-way adjacency and per-tile properties.
pub struct GridBoard {
    name: String,
    rows: u32,
    columns: u32,
    tiles: RwLock<HashMap<(u32, u32), Properties>>,
}

impl GridBoard {
    /// All-floor board of the given size
    pub fn new(name: impl Into<String>, rows: u32, columns: u32) -> Self {
        let mut tiles = HashMap::new();
        for row in 0..rows {
            for column in 0..columns {
                tiles.insert((row, column), floor());
            }
        }
        Self {
            name: name.into(),
            rows,
            columns,
            tiles: RwLock::new(tiles),
        }
    }

    /// Build a board from an ASCII map.
    ///
    /// `#` is an impassable wall; any other character is floor. Short lines
    /// are padded with floor. Blank leading/trailing lines are ignored.
    pub fn from_ascii(name: impl Into<String>, map: &str) -> Result<Self> {
        let lines: Vec<&str> = map
            .lines()
            .skip_while(|l| l.trim().is_empty())
            .collect();
        let lines: Vec<&str> = match lines.iter().rposition(|l| !l.trim().is_empty()) {
            Some(last) => lines[..=last].to_vec(),
            None => bail!("board map is empty"),
        };

        let rows = u32::try_from(lines.len())?;
        let columns = u32::try_from(lines.iter().map(|l| l.chars().count()).max().unwrap_or(0))?;
        let board = Self::new(name, rows, columns);

        {
            let mut tiles = board.tiles.write();
            for (row, line) in lines.iter().enumerate() {
                for (column, symbol) in line.chars().enumerate() {
                    if symbol == '#' {
                        let key = (u32::try_from(row)?, u32::try_from(column)?);
                        tiles.insert(key, wall());
                    }
                }
            }
        }

        Ok(board)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn tile(&self, row: u32, column: u32) -> Option<TileRef> {
        (row < self.rows && column < self.columns).then(|| TileRef::new(self.name.clone(), row, column))
    }

    /// Returns false if the tile is not on this board.
    pub fn set_tile_property(&self, tile: &TileRef, key: &str, value: Value) -> bool {
        if !self.contains_tile(tile) {
            return false;
        }
        let mut tiles = self.tiles.write();
        tiles
            .entry((tile.row, tile.column))
            .or_default()
            .insert(key.to_string(), value);
        true
    }
}

impl Board for GridBoard {
    fn name(&self) -> &str {
        &self.name
    }

    fn tiles(&self) -> Vec<TileRef> {
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |column| (row, column)))
            .map(|(row, column)| TileRef::new(self.name.clone(), row, column))
            .collect()
    }

    fn contains_tile(&self, tile: &TileRef) -> bool {
        tile.board == self.name && tile.row < self.rows && tile.column < self.columns
    }

    fn tile_properties(&self, tile: &TileRef) -> Properties {
        if !self.contains_tile(tile) {
            return Properties::new();
        }
        self.tiles
            .read()
            .get(&(tile.row, tile.column))
            .cloned()
            .unwrap_or_default()
    }

    fn adjacent_tile(&self, tile: &TileRef, direction: Direction) -> Option<TileRef> {
        if !self.contains_tile(tile) {
            return None;
        }
        let (dr, dc) = direction.offset();
        let row = u32::try_from(i64::from(tile.row) + dr).ok()?;
        let column = u32::try_from(i64::from(tile.column) + dc).ok()?;
        self.tile(row, column)
    }
}

fn floor() -> Properties {
    Properties::from([("type".to_string(), json!("floor"))])
}

fn wall() -> Properties {
    Properties::from([
        ("type".to_string(), json!("wall")),
        ("impassable".to_string(), json!("true")),
    ])
}
