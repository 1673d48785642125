use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::Game;
use crate::agent::Agent;
use crate::command::{Action, Command};
use crate::error::GameError;

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub tick: u64,
    /// Commands handed to their agents, including rejected ones
    pub commands_processed: usize,
    pub commands_rejected: usize,
    pub actions_applied: usize,
}

impl Game {
    /// Queue a command for the agent to handle on the next tick.
    pub fn enqueue_command(&self, agent: Arc<dyn Agent>, command: Command) {
        self.commands.lock().push((agent, command));
    }

    /// Queue a command for a connected agent by id.
    pub fn enqueue_command_for(&self, agent_id: &str, command: Command) -> Result<(), GameError> {
        let agent = self
            .agent(agent_id)
            .ok_or_else(|| GameError::NotFound(format!("agent {}", agent_id)))?;
        self.enqueue_command(agent, command);
        Ok(())
    }

    /// Queue an action to be applied on the next tick.
    pub fn enqueue_action(&self, action: Action) {
        self.actions.lock().push(action);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.lock().len()
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.lock().len()
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Run one tick: every queued command, then every queued action.
    ///
    /// Both queues are taken at the start of the tick, so anything queued
    /// while it runs waits for the next one. A rejected command is logged
    /// and skipped. A failing action stops the tick: the error is returned
    /// and the actions behind it go back to the front of the queue.
    pub fn run_tick(&self) -> Result<TickSummary, GameError> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let commands = std::mem::take(&mut *self.commands.lock());
        let actions = std::mem::take(&mut *self.actions.lock());

        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };

        for (agent, command) in commands {
            summary.commands_processed += 1;
            if let Err(e) = agent.receive_command(self, &command) {
                summary.commands_rejected += 1;
                warn!(
                    tick,
                    agent_id = %agent.agent_id(),
                    error = %e,
                    "Command rejected"
                );
            }
        }

        let mut pending = actions.into_iter();
        while let Some(action) = pending.next() {
            let description = action.log_description().to_string();
            match action.apply(self) {
                Ok(()) => {
                    summary.actions_applied += 1;
                    debug!(tick, action = %description, "Action applied");
                }
                Err(e) => {
                    let remaining: Vec<Action> = pending.collect();
                    error!(
                        tick,
                        action = %description,
                        requeued = remaining.len(),
                        error = %e,
                        "Action failed"
                    );
                    self.actions.lock().splice(0..0, remaining);
                    return Err(e);
                }
            }
        }

        debug!(
            tick,
            commands = summary.commands_processed,
            rejected = summary.commands_rejected,
            actions = summary.actions_applied,
            "Tick complete"
        );
        Ok(summary)
    }
}
