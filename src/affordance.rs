//! Movement affordances for rule modules.
//!
//! Each check is a plain function over current game state, and each
//! affordance builds a described [`Action`] for the game loop. The checks
//! run when the action is applied, not when it is built.

use tracing::debug;

use crate::command::Action;
use crate::container::{Container, TileRef};
use crate::entity::EntityId;
use crate::error::GameError;
use crate::game::Game;
use crate::properties::{is_truthy, HasProperties};

/// Tile `target` would be pushed onto by `pusher`.
///
/// Both entities must stand directly on adjacent tiles of the same board;
/// the target moves one tile further along the pusher-to-target direction.
pub fn push_destination(
    game: &Game,
    pusher: EntityId,
    target: EntityId,
) -> Result<Option<TileRef>, GameError> {
    let Container::Tile(from) = game.location_of(pusher)? else {
        return Ok(None);
    };
    let Container::Tile(at) = game.location_of(target)? else {
        return Ok(None);
    };
    if from.board != at.board {
        return Ok(None);
    }

    let board = game
        .board(&at.board)
        .ok_or_else(|| GameError::UnknownBoard(at.board.clone()))?;
    Ok(board
        .adjacent_tile_direction(&from, &at)
        .and_then(|direction| board.adjacent_tile(&at, direction)))
}

/// Whether something may be pushed into `container`.
///
/// Only tiles qualify, and only when neither the tile nor anything on it
/// is flagged `impassable`.
pub fn is_passable(game: &Game, container: &Container) -> bool {
    let Some(tile) = container.as_tile() else {
        return false;
    };
    let Some(board) = game.board(&tile.board) else {
        return false;
    };
    if is_truthy(board.tile_properties(tile).get("impassable")) {
        return false;
    }

    !game
        .contents_of(container)
        .into_iter()
        .filter_map(|id| game.entity(id))
        .any(|entity| entity.is_flag_set("impassable"))
}

/// Push `target` one tile away from `pusher`, if there is a tile there.
pub fn push_action(pusher: EntityId, target: EntityId) -> Action {
    Action::new(move |game| push(game, pusher, target, false))
        .describe(format!("entity {} pushed entity {}", pusher, target))
}

/// Like [`push_action`], but only onto a passable tile.
pub fn push_to_passable_action(pusher: EntityId, target: EntityId) -> Action {
    Action::new(move |game| push(game, pusher, target, true))
        .describe(format!("entity {} pushed entity {}", pusher, target))
}

/// Move `entity` into `container`.
pub fn move_action(entity: EntityId, container: Container) -> Action {
    let description = format!("entity {} moved to {}", entity, container);
    Action::new(move |game| {
        if game.entity(entity).is_none() {
            debug!(entity_id = entity, "Skipping move of departed entity");
            return Ok(());
        }
        game.move_entity(entity, container).map(|_| ())
    })
    .describe(description)
}

fn push(game: &Game, pusher: EntityId, target: EntityId, passable_only: bool) -> Result<(), GameError> {
    let destination = match push_destination(game, pusher, target) {
        Ok(destination) => destination,
        // Either party may have left the game since the push was queued
        Err(GameError::NotRegistered(id)) => {
            debug!(entity_id = id, "Skipping push involving departed entity");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let Some(tile) = destination else {
        return Ok(());
    };
    let destination = Container::Tile(tile);
    if passable_only && !is_passable(game, &destination) {
        debug!(entity_id = target, to = %destination, "Push blocked");
        return Ok(());
    }
    game.move_entity(target, destination).map(|_| ())
}
