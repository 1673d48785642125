// Transport bridge contract and in-process implementations

mod broadcast;

pub use broadcast::{BroadcastSink, SinkMessage};

use anyhow::Result;
use std::sync::Arc;

use crate::agent::AgentState;
use crate::board::BoardState;
use crate::entity::EntityState;
use crate::event::Event;

/// Handles raw JSON commands arriving for one agent
pub type CommandCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Handles raw JSON events arriving from remote peers
pub type EventCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The bridge between a game and its remote clients.
///
/// Receives every published event plus out-of-band state snapshots, and
/// routes inbound client messages back in as commands or remote events.
pub trait EventSink: Send + Sync {
    fn publish_event(&self, event: &Event) -> Result<()>;

    fn publish_board_state(&self, _board: &BoardState) -> Result<()> {
        Ok(())
    }

    fn publish_entity_state(&self, _entity: &EntityState) -> Result<()> {
        Ok(())
    }

    fn publish_agent_state(&self, _agent: &AgentState) -> Result<()> {
        Ok(())
    }

    fn register_command_callback(&self, _agent_id: &str, _callback: CommandCallback) -> Result<()> {
        Ok(())
    }

    fn register_event_callback(&self, _callback: EventCallback) -> Result<()> {
        Ok(())
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish_event(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}
