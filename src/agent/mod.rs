// Connected agents (players/controllers)

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::command::Command;
use crate::error::CommandError;
use crate::event::EventListener;
use crate::game::Game;
use crate::properties::{HasProperties, Properties};

/// An external actor acting within a game.
///
/// Not an entity: an agent may control any number of entities through the
/// commands it handles. Agents receive every game event while connected.
pub trait Agent: EventListener + HasProperties {
    fn agent_id(&self) -> &str;

    fn role(&self) -> &str;

    /// Turn a command into game effects, typically by queueing actions.
    fn receive_command(&self, game: &Game, command: &Command) -> Result<(), CommandError>;
}

/// Serializable agent snapshot for the transport sink
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    pub role: String,
    pub properties: Properties,
}

impl AgentState {
    pub fn of(agent: &dyn Agent) -> Self {
        Self {
            id: agent.agent_id().to_string(),
            role: agent.role().to_string(),
            properties: agent.properties(),
        }
    }
}

/// Connected agents keyed by agent id, independent of entity state.
#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the agent previously under this id.
    pub fn insert(&self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        self.agents.insert(agent.agent_id().to_string(), agent)
    }

    pub fn remove(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.remove(agent_id).map(|(_, agent)| agent)
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_id).map(|a| Arc::clone(a.value()))
    }

    pub fn all(&self) -> Vec<Arc<dyn Agent>> {
        let mut agents: Vec<_> = self.agents.iter().map(|a| Arc::clone(a.value())).collect();
        agents.sort_by(|a, b| a.agent_id().cmp(b.agent_id()));
        agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
