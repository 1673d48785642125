// Identifier counters and game time
pub mod clock;
pub mod ids;

// Errors and the property capability
pub mod error;
pub mod properties;

// Entities, containers and placement
pub mod container;
pub mod entity;

// Events and fan-out
pub mod event;

// Boards, agents, commands and actions
pub mod agent;
pub mod board;
pub mod command;

// Game state engine and loop
pub mod game;

// Movement and push rules
pub mod affordance;

// Collaborators: persistence and transport
pub mod nats;
pub mod sink;
pub mod store;

// Server configuration
pub mod config;

pub use container::{Container, TileRef};
pub use entity::{Entity, EntityId, NewEntity};
pub use error::{CommandError, GameError};
pub use event::{Event, EventListener, StateRef};
pub use game::{Game, GameBuilder, GameLoop, LoopState, TickSummary};
