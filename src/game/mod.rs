//! The game: one authoritative state engine instance.
//!
//! A [`Game`] owns every component of the engine as an explicit field:
//! the id allocator, entity registry, container index, event bus, agent
//! registry and the command/action queues. Nothing is process-global, so
//! several games can run side by side.

mod entities;
mod game_loop;
mod schedule;

pub use entities::ContainerHandle;
pub use game_loop::{GameLoop, LoopState};
pub use schedule::TickSummary;

use anyhow::Context;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::agent::{Agent, AgentRegistry, AgentState};
use crate::board::{Board, BoardState, TileState};
use crate::clock::GameClock;
use crate::command::{Action, Command};
use crate::container::{Container, ContainerIndex};
use crate::entity::{EntityId, EntityRegistry};
use crate::error::GameError;
use crate::event::{Event, EventBus, EventListener, StateRef};
use crate::ids::IdAllocator;
use crate::properties::Properties;
use crate::sink::{CommandCallback, EventCallback, EventSink, NullSink};
use crate::store::DataStore;

#[cfg(test)]
mod tests;

/// Authoritative in-memory state for one game.
pub struct Game {
    id: String,
    ids: Arc<IdAllocator>,
    clock: GameClock,

    entities: EntityRegistry,
    index: ContainerIndex,
    bus: EventBus,
    agents: AgentRegistry,
    boards: DashMap<String, Arc<dyn Board>>,

    /// Entity kinds whose instances are looked up in and saved to the data store
    persistent_kinds: DashSet<String>,
    /// Listeners attached to registered entities, removed on deregistration
    entity_listeners: DashMap<EntityId, Arc<dyn EventListener>>,

    data_store: Option<Arc<dyn DataStore>>,
    sink: Arc<dyn EventSink>,

    commands: Mutex<Vec<(Arc<dyn Agent>, Command)>>,
    actions: Mutex<Vec<Action>>,
    ticks: AtomicU64,
}

/// Configures and builds a [`Game`].
pub struct GameBuilder {
    id: String,
    data_store: Option<Arc<dyn DataStore>>,
    sink: Arc<dyn EventSink>,
    elapsed_offset_ms: u64,
    persistent_kinds: HashSet<String>,
    boards: Vec<Arc<dyn Board>>,
}

impl GameBuilder {
    pub fn data_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.data_store = Some(store);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Game time already elapsed before this start (resumed games)
    pub fn elapsed_offset_ms(mut self, offset: u64) -> Self {
        self.elapsed_offset_ms = offset;
        self
    }

    /// Mark an entity kind as persistent.
    pub fn persistent_kind(mut self, kind: impl Into<String>) -> Self {
        self.persistent_kinds.insert(kind.into());
        self
    }

    pub fn board(mut self, board: Arc<dyn Board>) -> Self {
        self.boards.push(board);
        self
    }

    /// Build the game, seeding the entity counter past the data store's largest id.
    pub fn build(self) -> Result<Game, GameError> {
        let max_persisted = match &self.data_store {
            Some(store) => store
                .max_entity_id()
                .context("Failed to read max entity id from data store")?,
            None => 0,
        };

        let game = Game::assemble(
            self.id,
            max_persisted,
            self.elapsed_offset_ms,
            self.data_store,
            self.sink,
            self.persistent_kinds.into_iter().collect(),
        );
        for board in self.boards {
            game.add_board(board);
        }

        info!(
            game_id = %game.id,
            next_entity_id = game.ids.peek_entity_id(),
            "Game created"
        );
        Ok(game)
    }
}

impl Game {
    pub fn builder(id: impl Into<String>) -> GameBuilder {
        GameBuilder {
            id: id.into(),
            data_store: None,
            sink: Arc::new(NullSink),
            elapsed_offset_ms: 0,
            persistent_kinds: HashSet::new(),
            boards: Vec::new(),
        }
    }

    /// Game with no data store, no boards and a sink that drops everything
    pub fn new(id: impl Into<String>) -> Self {
        Self::assemble(id.into(), 0, 0, None, Arc::new(NullSink), DashSet::new())
    }

    fn assemble(
        id: String,
        max_persisted: EntityId,
        elapsed_offset_ms: u64,
        data_store: Option<Arc<dyn DataStore>>,
        sink: Arc<dyn EventSink>,
        persistent_kinds: DashSet<String>,
    ) -> Self {
        let ids = Arc::new(IdAllocator::new(max_persisted));
        let clock = GameClock::new(elapsed_offset_ms);
        let bus = EventBus::new(Arc::clone(&ids), clock.clone(), Arc::clone(&sink));

        Self {
            id,
            ids,
            clock,
            entities: EntityRegistry::new(),
            index: ContainerIndex::new(),
            bus,
            agents: AgentRegistry::new(),
            boards: DashMap::new(),
            persistent_kinds,
            entity_listeners: DashMap::new(),
            data_store,
            sink,
            commands: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wall-clock time of the last start
    pub fn start_time(&self) -> DateTime<Utc> {
        self.clock.started_at()
    }

    /// Milliseconds of game time since start, including any resumed offset
    pub fn game_time(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    pub fn data_store(&self) -> Option<&Arc<dyn DataStore>> {
        self.data_store.as_ref()
    }

    /// Mark an entity kind as persistent from now on.
    pub fn register_persistent_kind(&self, kind: impl Into<String>) {
        self.persistent_kinds.insert(kind.into());
    }

    pub fn is_persistent_kind(&self, kind: &str) -> bool {
        self.persistent_kinds.contains(kind)
    }

    // --- listeners & events ---

    /// Begin forwarding all game events to `listener`. Idempotent.
    pub fn register_listener(&self, listener: Arc<dyn EventListener>) -> bool {
        self.bus.register(listener)
    }

    /// Stop forwarding events to `listener`. Idempotent.
    pub fn deregister_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.bus.deregister(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    /// Publish a rule-module event through the same ordered bus.
    pub fn emit(
        &self,
        kind: &str,
        properties: Properties,
        updated_state: impl IntoIterator<Item = StateRef>,
    ) -> Event {
        self.bus.publish(kind, properties, updated_state)
    }

    /// Publish an event once `delay` has passed.
    ///
    /// The id and timestamp are assigned at publication, so the event still
    /// takes its place in id order. Resolves to `None` if the game was
    /// dropped first. Needs a Tokio runtime.
    pub fn emit_after(
        self: &Arc<Self>,
        delay: Duration,
        kind: impl Into<String>,
        properties: Properties,
        updated_state: Vec<StateRef>,
    ) -> anyhow::Result<JoinHandle<Option<Event>>> {
        let runtime = Handle::try_current().context("Delayed events need a Tokio runtime")?;
        let game: Weak<Game> = Arc::downgrade(self);
        let kind = kind.into();

        Ok(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let game = game.upgrade()?;
            Some(game.emit(&kind, properties, updated_state))
        }))
    }

    /// Deliver an event that happened elsewhere to local listeners.
    ///
    /// It keeps its own id and does not go back out to the sink.
    pub fn relay_event(&self, event: Event) {
        self.bus.relay(event);
    }

    /// Route remote events arriving at the sink to local listeners.
    pub fn bind_remote_events(self: &Arc<Self>) -> anyhow::Result<()> {
        let game: Weak<Game> = Arc::downgrade(self);
        let callback: EventCallback = Arc::new(move |json: &str| {
            let Some(game) = game.upgrade() else {
                return;
            };
            match Event::from_json(json) {
                Ok(event) => game.relay_event(event),
                Err(e) => warn!(game_id = %game.id(), error = %e, "Discarding inbound event"),
            }
        });
        self.sink
            .register_event_callback(callback)
            .context("Failed to bind remote events")
    }

    // --- agents ---

    /// Add an agent: load its stored properties, subscribe it to events
    /// and announce it to the sink. Replaces any agent with the same id.
    pub fn add_agent(&self, agent: Arc<dyn Agent>) {
        if let Some(store) = &self.data_store {
            if let Err(e) = store.load(agent.as_ref()) {
                warn!(agent_id = %agent.agent_id(), error = %e, "Failed to load agent properties");
            }
        }

        if let Some(previous) = self.agents.insert(Arc::clone(&agent)) {
            let previous: Arc<dyn EventListener> = previous;
            self.bus.deregister(&previous);
        }
        let listener: Arc<dyn EventListener> = agent.clone();
        self.bus.register(listener);

        if let Err(e) = self.sink.publish_agent_state(&AgentState::of(agent.as_ref())) {
            warn!(agent_id = %agent.agent_id(), error = %e, "Failed to publish agent state");
        }
        info!(agent_id = %agent.agent_id(), role = %agent.role(), "Agent joined");
    }

    pub fn remove_agent(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        let agent = self.agents.remove(agent_id)?;
        let listener: Arc<dyn EventListener> = agent.clone();
        self.bus.deregister(&listener);
        info!(agent_id = %agent_id, "Agent left");
        Some(agent)
    }

    pub fn agent(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_id)
    }

    pub fn agents(&self) -> Vec<Arc<dyn Agent>> {
        self.agents.all()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Route client messages for `agent_id` from the sink into the command queue.
    pub fn bind_agent_commands(self: &Arc<Self>, agent_id: &str) -> anyhow::Result<()> {
        let game: Weak<Game> = Arc::downgrade(self);
        let target = agent_id.to_string();
        let callback: CommandCallback = Arc::new(move |json: &str| {
            let Some(game) = game.upgrade() else {
                return;
            };
            let queued = Command::from_json(game.id(), json)
                .map_err(anyhow::Error::from)
                .and_then(|command| {
                    game.enqueue_command_for(&target, command)
                        .map_err(anyhow::Error::from)
                });
            if let Err(e) = queued {
                warn!(agent_id = %target, error = %e, "Discarding inbound command");
            }
        });
        self.sink
            .register_command_callback(agent_id, callback)
            .with_context(|| format!("Failed to bind commands for agent {}", agent_id))
    }

    // --- boards ---

    pub fn add_board(&self, board: Arc<dyn Board>) {
        info!(board = %board.name(), "Board added");
        self.boards.insert(board.name().to_string(), board);
    }

    pub fn board(&self, name: &str) -> Option<Arc<dyn Board>> {
        self.boards.get(name).map(|b| Arc::clone(b.value()))
    }

    pub fn board_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.boards.iter().map(|b| b.key().clone()).collect();
        names.sort();
        names
    }

    /// Remove a board and deregister every entity on its tiles, nested
    /// entities before their holders. Returns the removed ids in that order.
    pub fn remove_board(&self, name: &str) -> Result<Vec<EntityId>, GameError> {
        // Removed first so nothing new can be moved onto it
        let (_, board) = self
            .boards
            .remove(name)
            .ok_or_else(|| GameError::UnknownBoard(name.to_string()))?;

        let mut doomed = Vec::new();
        for tile in board.tiles() {
            for id in self.index.contents_of(&Container::Tile(tile)) {
                self.collect_nested(id, &mut doomed);
            }
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            match self.deregister_entity(id) {
                Ok(_) => removed.push(id),
                // Already gone through another path
                Err(GameError::NotRegistered(_)) => {}
                Err(e) => return Err(e),
            }
        }

        info!(board = %name, removed = removed.len(), "Board removed");
        Ok(removed)
    }

    fn collect_nested(&self, id: EntityId, out: &mut Vec<EntityId>) {
        for child in self.index.contents_of(&Container::Entity(id)) {
            self.collect_nested(child, out);
        }
        out.push(id);
    }

    // --- state publication ---

    pub fn board_state(&self, name: &str) -> Result<BoardState, GameError> {
        let board = self
            .board(name)
            .ok_or_else(|| GameError::UnknownBoard(name.to_string()))?;
        let tiles = board
            .tiles()
            .into_iter()
            .map(|tile| TileState {
                row: tile.row,
                column: tile.column,
                properties: board.tile_properties(&tile),
                entities: self.index.contents_of(&Container::Tile(tile)),
            })
            .collect();
        Ok(BoardState {
            name: name.to_string(),
            tiles,
        })
    }

    pub fn publish_board_state(&self, name: &str) -> anyhow::Result<()> {
        let state = self.board_state(name)?;
        self.sink.publish_board_state(&state)
    }

    pub fn publish_entity_state(&self, id: EntityId) -> anyhow::Result<()> {
        let state = self.entity_state(id)?;
        self.sink.publish_entity_state(&state)
    }

    pub fn publish_agent_state(&self, agent_id: &str) -> anyhow::Result<()> {
        let agent = self
            .agent(agent_id)
            .ok_or_else(|| GameError::NotFound(format!("agent {}", agent_id)))?;
        self.sink.publish_agent_state(&AgentState::of(agent.as_ref()))
    }
}
