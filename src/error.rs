use crate::container::Container;
use crate::entity::EntityId;

/// Errors raised by game state operations.
///
/// `NotRegistered` and `UnknownContainer` indicate a caller bypassed
/// registration. They are defects and are propagated, never tolerated.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The entity id is not present in the registry.
    #[error("entity {0} is not registered")]
    NotRegistered(EntityId),

    /// The target container refers to something the game does not know.
    #[error("container {0} is not registered")]
    UnknownContainer(Container),

    /// The move would place an entity inside itself.
    #[error("moving entity {entity} into {container} would create a containment cycle")]
    ContainmentCycle {
        entity: EntityId,
        container: Container,
    },

    /// No board with this name has been added to the game.
    #[error("board '{0}' is not part of this game")]
    UnknownBoard(String),

    /// A lookup by id or search criteria found nothing usable.
    #[error("{0} not found")]
    NotFound(String),

    /// Attempted to modify an object whose properties are fixed.
    #[error("{0} properties are immutable")]
    Immutable(&'static str),

    /// Persistence collaborator failure.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Failure raised by an agent while handling a command.
///
/// Contained by the game loop: logged, never propagated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The command payload could not be understood.
    #[error("malformed command: {0}")]
    Malformed(String),

    /// The command was understood but cannot be applied.
    #[error("command rejected: {0}")]
    Rejected(String),
}
