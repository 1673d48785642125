use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::NatsConfig;
use crate::agent::AgentState;
use crate::board::BoardState;
use crate::entity::EntityState;
use crate::event::Event;
use crate::sink::{CommandCallback, EventCallback, EventSink};

/// Subject layout for one game
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subjects {
    base: String,
}

impl Subjects {
    pub fn new(prefix: &str, game_id: &str) -> Self {
        Self {
            base: format!("{}.{}", prefix, game_id),
        }
    }

    /// Subject format: {prefix}.{game}.events
    pub fn events(&self) -> String {
        format!("{}.events", self.base)
    }

    /// Subject format: {prefix}.{game}.events.inbound
    pub fn inbound_events(&self) -> String {
        format!("{}.events.inbound", self.base)
    }

    /// Subject format: {prefix}.{game}.state.{board|entity|agent}
    pub fn state(&self, kind: &str) -> String {
        format!("{}.state.{}", self.base, kind)
    }

    /// Subject format: {prefix}.{game}.agents.{agent}.commands
    pub fn commands(&self, agent_id: &str) -> String {
        format!("{}.agents.{}.commands", self.base, agent_id)
    }
}

struct Outbound {
    subject: String,
    payload: Vec<u8>,
}

/// Event sink that bridges a game to remote clients over NATS.
///
/// Game threads never wait on the network: messages are serialized on the
/// caller's thread and handed to a single publisher task, which sends them
/// in the order they were published.
pub struct NatsBridge {
    client: async_nats::Client,
    subjects: Subjects,
    outbound: mpsc::UnboundedSender<Outbound>,
    runtime: Handle,
}

impl NatsBridge {
    /// Connect to NATS and start the publisher task.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn connect(config: &NatsConfig, game_id: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = async_nats::connect(&config.url)
            .await
            .context("Failed to connect to NATS")?;

        Ok(Self::with_client(
            client,
            Subjects::new(&config.subject_prefix, game_id),
        ))
    }

    fn with_client(client: async_nats::Client, subjects: Subjects) -> Self {
        let (outbound, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_publisher(client.clone(), queue));

        Self {
            client,
            subjects,
            outbound,
            runtime: Handle::current(),
        }
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    fn enqueue<T: Serialize>(&self, subject: String, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)
            .with_context(|| format!("Failed to serialize message for '{}'", subject))?;
        self.outbound
            .send(Outbound { subject, payload })
            .map_err(|_| anyhow::anyhow!("NATS publisher task has stopped"))
    }

    /// Subscribe to `subject` and hand each UTF-8 payload to `callback`.
    fn forward(&self, subject: String, callback: Arc<dyn Fn(&str) + Send + Sync>) {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            let mut messages = match client.subscribe(subject.clone()).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(subject = %subject, error = %e, "Failed to subscribe");
                    return;
                }
            };

            while let Some(msg) = messages.next().await {
                match std::str::from_utf8(&msg.payload) {
                    Ok(json) => callback(json),
                    Err(e) => {
                        warn!(subject = %subject, error = %e, "Payload is not UTF-8");
                    }
                }
            }
            debug!(subject = %subject, "Subscription closed");
        });
    }
}

impl EventSink for NatsBridge {
    fn publish_event(&self, event: &Event) -> Result<()> {
        self.enqueue(self.subjects.events(), event)
    }

    fn publish_board_state(&self, board: &BoardState) -> Result<()> {
        self.enqueue(self.subjects.state("board"), board)
    }

    fn publish_entity_state(&self, entity: &EntityState) -> Result<()> {
        self.enqueue(self.subjects.state("entity"), entity)
    }

    fn publish_agent_state(&self, agent: &AgentState) -> Result<()> {
        self.enqueue(self.subjects.state("agent"), agent)
    }

    fn register_command_callback(&self, agent_id: &str, callback: CommandCallback) -> Result<()> {
        let subject = self.subjects.commands(agent_id);
        info!(agent_id = %agent_id, subject = %subject, "Listening for agent commands");
        self.forward(subject, callback);
        Ok(())
    }

    fn register_event_callback(&self, callback: EventCallback) -> Result<()> {
        let subject = self.subjects.inbound_events();
        info!(subject = %subject, "Listening for remote events");
        self.forward(subject, callback);
        Ok(())
    }
}

async fn run_publisher(client: async_nats::Client, mut queue: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(Outbound { subject, payload }) = queue.recv().await {
        debug!(subject = %subject, bytes = payload.len(), "Publishing to NATS");
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            warn!(subject = %subject, error = %e, "Failed to publish to NATS");
        }
    }
    debug!("NATS publisher stopped");
}
