use anyhow::Result;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::{CommandCallback, EventCallback, EventSink};
use crate::agent::AgentState;
use crate::board::BoardState;
use crate::entity::EntityState;
use crate::event::Event;

/// Everything a sink can be handed, as one message type
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "message", rename_all = "kebab-case")]
pub enum SinkMessage {
    Event(Event),
    BoardState(BoardState),
    EntityState(EntityState),
    AgentState(AgentState),
}

/// In-process sink: re-broadcasts on a tokio channel.
///
/// Command and event callbacks are kept so an in-process transport (or a
/// test) can push client messages with [`BroadcastSink::deliver_command`]
/// and remote events with [`BroadcastSink::deliver_event`].
pub struct BroadcastSink {
    tx: broadcast::Sender<SinkMessage>,
    callbacks: DashMap<String, CommandCallback>,
    event_callbacks: RwLock<Vec<EventCallback>>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            callbacks: DashMap::new(),
            event_callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SinkMessage> {
        self.tx.subscribe()
    }

    /// Hand a raw client message to the agent's registered callback.
    ///
    /// Returns false if no callback is registered for the agent.
    pub fn deliver_command(&self, agent_id: &str, json: &str) -> bool {
        // Clone out of the map so the callback runs without holding a shard lock
        let callback = self.callbacks.get(agent_id).map(|c| c.value().clone());
        match callback {
            Some(callback) => {
                callback(json);
                true
            }
            None => {
                debug!(agent_id = %agent_id, "No command callback registered");
                false
            }
        }
    }

    /// Hand a raw remote event to every registered event callback.
    ///
    /// Returns how many callbacks received it.
    pub fn deliver_event(&self, json: &str) -> usize {
        let callbacks = self.event_callbacks.read().clone();
        for callback in &callbacks {
            callback(json);
        }
        callbacks.len()
    }

    fn send(&self, message: SinkMessage) {
        // No receivers is fine
        let _ = self.tx.send(message);
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventSink for BroadcastSink {
    fn publish_event(&self, event: &Event) -> Result<()> {
        self.send(SinkMessage::Event(event.clone()));
        Ok(())
    }

    fn publish_board_state(&self, board: &BoardState) -> Result<()> {
        self.send(SinkMessage::BoardState(board.clone()));
        Ok(())
    }

    fn publish_entity_state(&self, entity: &EntityState) -> Result<()> {
        self.send(SinkMessage::EntityState(entity.clone()));
        Ok(())
    }

    fn publish_agent_state(&self, agent: &AgentState) -> Result<()> {
        self.send(SinkMessage::AgentState(agent.clone()));
        Ok(())
    }

    fn register_command_callback(&self, agent_id: &str, callback: CommandCallback) -> Result<()> {
        self.callbacks.insert(agent_id.to_string(), callback);
        Ok(())
    }

    fn register_event_callback(&self, callback: EventCallback) -> Result<()> {
        self.event_callbacks.write().push(callback);
        Ok(())
    }
}
